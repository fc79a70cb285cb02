//! Terminal outcomes and what the user is told about them

use std::io::{self, Write};

use crate::protocol::{EditError, EditFailure, FetchError};

/// How an invocation ended. Produced exactly once per run.
#[derive(Debug)]
pub enum Outcome {
    Updated { namespace: String, name: String },
    CancelledNoChange,
    CancelledInvalid(EditFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::CancelledInvalid(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Metadata field behind an identity rejection, if that is why we stopped
    pub fn invalid_field(&self) -> Option<&'static str> {
        match self {
            Outcome::CancelledInvalid(EditFailure {
                error: EditError::Identity(e),
                ..
            }) => Some(e.field()),
            _ => None,
        }
    }

    /// Print the user-facing report: confirmations to `out`, failures to `err`
    pub fn report(&self, out: &mut dyn Write, err: &mut dyn Write) -> io::Result<()> {
        match self {
            Outcome::Updated { namespace, name } => writeln!(out, "{}/{} edited", namespace, name),
            Outcome::CancelledNoChange => writeln!(out, "Edit cancelled, no changes made."),
            Outcome::CancelledInvalid(failure) => {
                writeln!(err, "Edit cancelled, no valid changes were saved.")?;
                if let Some(path) = &failure.artifact {
                    writeln!(err, "A copy of your changes has been stored to: {}.", path.display())?;
                }
                writeln!(err, "error: {}", failure.error)
            }
        }
    }
}

/// Print a fetch failure, which ends the run before any outcome exists
pub fn report_fetch_error(error: &FetchError, err: &mut dyn Write) -> io::Result<()> {
    writeln!(err, "{}", error)?;
    writeln!(err, "error: {}", error.source)
}
