//! secret-edit-core - Shared functionality for the secret editing tools
//!
//! Standard locations for configuration and the process plumbing used to
//! talk to external binaries (the cluster client, the user's editor).

pub mod paths;
pub mod process;

pub use paths::Paths;
pub use process::{find_executable_in, run_with_input, CommandOutput};
