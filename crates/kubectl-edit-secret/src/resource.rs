//! Secret resource model
//!
//! A secret is identified by namespace + name and stamped with the
//! resourceVersion it was read at. Its payload is one ordered map of
//! key -> value; whether a value is shown as text or kept as bytes is a
//! presentation detail decided by the codec.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

pub const API_VERSION: &str = "v1";
pub const KIND: &str = "Secret";

/// Identity-bearing metadata plus everything else the server sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    /// Optimistic concurrency stamp, echoed back unchanged on update
    #[serde(default)]
    pub resource_version: String,

    /// labels, annotations, uid, ... carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One payload value
#[derive(Debug, Clone, Eq)]
pub enum SecretValue {
    Text(String),
    Binary(Vec<u8>),
}

impl SecretValue {
    /// Classify raw bytes: valid UTF-8 becomes `Text`, anything else `Binary`
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => SecretValue::Text(text),
            Err(e) => SecretValue::Binary(e.into_bytes()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SecretValue::Text(s) => s.as_bytes(),
            SecretValue::Binary(b) => b,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SecretValue::Text(_))
    }
}

// Two values are the same secret if they carry the same bytes.
impl PartialEq for SecretValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl From<&str> for SecretValue {
    fn from(s: &str) -> Self {
        SecretValue::Text(s.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue::Text(s)
    }
}

impl From<Vec<u8>> for SecretValue {
    fn from(b: Vec<u8>) -> Self {
        SecretValue::from_bytes(b)
    }
}

/// Ordered key -> value mapping of a secret
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    entries: BTreeMap<String, SecretValue>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the two layers a secret document may carry.
    ///
    /// `binary` is applied first and `text` second; on a key present in both
    /// the text entry wins.
    pub fn merged<B, T>(binary: B, text: T) -> Self
    where
        B: IntoIterator<Item = (String, Vec<u8>)>,
        T: IntoIterator<Item = (String, String)>,
    {
        let mut payload = Self::new();
        for (key, bytes) in binary {
            payload.insert(key, SecretValue::from_bytes(bytes));
        }
        for (key, text) in text {
            payload.insert(key, SecretValue::Text(text));
        }
        payload
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SecretValue>) -> Option<SecretValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&SecretValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SecretValue> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<SecretValue>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = (&'a String, &'a SecretValue);
    type IntoIter = btree_map::Iter<'a, String, SecretValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A stored secret
#[derive(Debug, Clone, PartialEq)]
pub struct Secret {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    /// Secret type, e.g. `Opaque` or `kubernetes.io/tls`
    pub type_: Option<String>,
    pub immutable: Option<bool>,
    pub payload: Payload,
}

impl Secret {
    pub fn new(namespace: &str, name: &str, resource_version: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: namespace.to_string(),
                resource_version: resource_version.to_string(),
                extra: serde_json::Map::new(),
            },
            type_: Some("Opaque".to_string()),
            immutable: None,
            payload: Payload::new(),
        }
    }

    pub fn with_value(mut self, key: &str, value: impl Into<SecretValue>) -> Self {
        self.payload.insert(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn resource_version(&self) -> &str {
        &self.metadata.resource_version
    }

    /// `namespace/name`, as shown to the user
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_classifies() {
        assert!(SecretValue::from_bytes(b"hunter2".to_vec()).is_text());
        assert!(!SecretValue::from_bytes(vec![0xff, 0xfe, 0x00]).is_text());
    }

    #[test]
    fn test_value_equality_is_by_bytes() {
        assert_eq!(SecretValue::Text("abc".into()), SecretValue::Binary(b"abc".to_vec()));
        assert_ne!(SecretValue::Text("abc".into()), SecretValue::Text("abd".into()));
    }

    #[test]
    fn test_merge_text_wins() {
        let payload = Payload::merged(
            vec![
                ("password".to_string(), b"from-data".to_vec()),
                ("user".to_string(), b"admin".to_vec()),
            ],
            vec![("password".to_string(), "from-string-data".to_string())],
        );

        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("password"), Some(&SecretValue::from("from-string-data")));
        assert_eq!(payload.get("user"), Some(&SecretValue::from("admin")));
    }

    #[test]
    fn test_keys_are_ordered() {
        let payload: Payload = vec![("zeta", "1"), ("alpha", "2"), ("mid", "3")].into_iter().collect();
        let keys: Vec<&str> = payload.keys().collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_qualified_name() {
        let secret = Secret::new("default", "db-pass", "v1");
        assert_eq!(secret.qualified_name(), "default/db-pass");
        assert_eq!(secret.resource_version(), "v1");
    }
}
