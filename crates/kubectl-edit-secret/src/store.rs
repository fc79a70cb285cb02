//! Secret store seam
//!
//! Fetching and persisting secrets is someone else's job (the cluster, via
//! kubectl). The protocol only needs these two calls.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

use crate::codec::ParseError;
use crate::resource::Secret;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The stored secret moved past the resourceVersion we read
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("kubectl not found on PATH - install it or set `kubectl` in the config file")]
    KubectlNotFound,

    #[error("{command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("failed to run kubectl: {0}")]
    Io(#[from] io::Error),

    #[error("unexpected secret from store: {0}")]
    Decode(#[from] ParseError),
}

/// Where secrets live
pub trait SecretStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;

    /// Write `secret` back. Its resourceVersion must match the stored one;
    /// returns the secret as stored, with the new resourceVersion.
    fn update(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

/// In-process store with the same optimistic-concurrency rules as the cluster
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: RefCell<BTreeMap<(String, String), Secret>>,
    updates: RefCell<Vec<Secret>>,
    next_version: Cell<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, secret: Secret) -> Self {
        self.put(secret);
        self
    }

    /// Insert or overwrite without any version check
    pub fn put(&self, secret: Secret) {
        let key = (secret.namespace().to_string(), secret.name().to_string());
        self.secrets.borrow_mut().insert(key, secret);
    }

    /// Every secret passed to `update`, in call order, as received
    pub fn updates(&self) -> Vec<Secret> {
        self.updates.borrow().clone()
    }

    fn bump_version(&self) -> String {
        let next = self.next_version.get() + 1;
        self.next_version.set(next);
        format!("mem-{}", next)
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.secrets
            .borrow()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    fn update(&self, secret: &Secret) -> Result<Secret, StoreError> {
        self.updates.borrow_mut().push(secret.clone());

        let current = self.get(secret.namespace(), secret.name())?;
        if current.resource_version() != secret.resource_version() {
            return Err(StoreError::Conflict(format!(
                "the object has been modified; stored resourceVersion is {}, update carried {}",
                current.resource_version(),
                secret.resource_version()
            )));
        }

        let mut stored = secret.clone();
        stored.metadata.resource_version = self.bump_version();
        self.put(stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new().with_secret(Secret::new("default", "db-pass", "v1").with_value("password", "secret123"))
    }

    #[test]
    fn test_get() {
        let secret = store().get("default", "db-pass").unwrap();
        assert_eq!(secret.resource_version(), "v1");
        assert!(matches!(store().get("prod", "db-pass"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_update_bumps_version() {
        let store = store();
        let mut secret = store.get("default", "db-pass").unwrap();
        secret.payload.insert("password", "secret456");

        let stored = store.update(&secret).unwrap();
        assert_ne!(stored.resource_version(), "v1");
        assert_eq!(store.get("default", "db-pass").unwrap(), stored);
        assert_eq!(store.updates().len(), 1);
        assert_eq!(store.updates()[0].resource_version(), "v1");
    }

    #[test]
    fn test_stale_update_conflicts() {
        let store = store();
        let secret = store.get("default", "db-pass").unwrap();
        store.update(&secret).unwrap();

        let err = store.update(&secret).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
