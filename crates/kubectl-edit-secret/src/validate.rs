//! Identity checks on an edited secret
//!
//! The user may rewrite the payload however they like, but the fields that
//! say *which* secret this is, and which version of it was read, must come
//! back untouched. Checks run in a fixed order and stop at the first
//! failure: resourceVersion, then namespace, then name.

use thiserror::Error;

use crate::resource::Secret;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("metadata.resourceVersion shouldn't be changed (was {original:?}, now {edited:?}); fetch the secret again if it changed on the server")]
    ResourceVersion { original: String, edited: String },

    #[error("metadata.namespace shouldn't be changed (was {original:?}, now {edited:?})")]
    Namespace { original: String, edited: String },

    #[error("metadata.name shouldn't be changed (was {original:?}, now {edited:?})")]
    Name { original: String, edited: String },
}

impl ValidationError {
    /// The metadata field that was tampered with
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::ResourceVersion { .. } => "resourceVersion",
            ValidationError::Namespace { .. } => "namespace",
            ValidationError::Name { .. } => "name",
        }
    }
}

/// Reject edits that change identity. Never corrects, only rejects.
pub fn validate(original: &Secret, edited: &Secret) -> Result<(), ValidationError> {
    if original.resource_version() != edited.resource_version() {
        return Err(ValidationError::ResourceVersion {
            original: original.resource_version().to_string(),
            edited: edited.resource_version().to_string(),
        });
    }
    if original.namespace() != edited.namespace() {
        return Err(ValidationError::Namespace {
            original: original.namespace().to_string(),
            edited: edited.namespace().to_string(),
        });
    }
    if original.name() != edited.name() {
        return Err(ValidationError::Name {
            original: original.name().to_string(),
            edited: edited.name().to_string(),
        });
    }
    Ok(())
}
