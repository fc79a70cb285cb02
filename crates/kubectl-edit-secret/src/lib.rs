//! kubectl-edit-secret - Edit a Kubernetes secret with its values in plain text
//!
//! `kubectl edit secret` shows base64. This tool fetches the secret, moves
//! every value into `stringData` as readable text, opens it in your editor
//! and writes the result back, refusing edits that would change which
//! secret is being written or which version it was based on.
//!
//! The round trip lives in [`protocol`]; the cluster and the editor sit
//! behind the [`SecretStore`] and [`Editor`] traits.

pub mod codec;
pub mod config;
pub mod detect;
pub mod editor;
pub mod kubectl;
pub mod outcome;
pub mod protocol;
pub mod resource;
pub mod store;
pub mod validate;

pub use config::EditConfig;
pub use editor::{Editor, ExternalEditor};
pub use kubectl::KubectlStore;
pub use outcome::Outcome;
pub use protocol::{edit_secret, run, EditOptions};
pub use resource::{Payload, Secret, SecretValue};
pub use store::{MemoryStore, SecretStore, StoreError};
