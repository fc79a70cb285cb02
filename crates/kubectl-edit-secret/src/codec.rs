//! Secret codec
//!
//! Two encodings of the same [`Secret`]:
//!
//! - the wire form, Kubernetes JSON with every value base64 encoded under
//!   `data`, used to talk to the cluster;
//! - the edit form, YAML shown to the user, where every value that is valid
//!   UTF-8 appears as plain text under `stringData`. Values that are not
//!   text stay base64 under `data` so nothing is lost on the way back.
//!
//! Both decoders merge `data` and `stringData` into one payload, text last.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::resource::{ObjectMeta, Payload, Secret, SecretValue, API_VERSION, KIND};

/// Help text prepended to the edit form
pub const EDIT_HEADER: &str = "\
# Please edit the secret below. Lines beginning with a '#' will be ignored.
# Values under 'stringData' are plain text; values under 'data' are base64.
# Saving the file without changes cancels the edit.
#
";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("edited file is empty")]
    Empty,

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data.{key} is not valid base64: {source}")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// String value of a secret.
///
/// Unquoted numbers and booleans are rejected instead of being rendered
/// back from the parsed value, which would silently turn `3.10` into `3.1`
/// or `0x1F` into `31`. A null value is the empty string.
#[derive(Debug, Clone, PartialEq, Default)]
struct ScalarText(String);

impl Serialize for ScalarText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = ScalarText;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string (quote numbers and booleans, e.g. \"3.10\")")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ScalarText(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ScalarText(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Err(E::invalid_type(Unexpected::Bool(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Err(E::invalid_type(Unexpected::Signed(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Err(E::invalid_type(Unexpected::Unsigned(v), &self))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Err(E::invalid_type(Unexpected::Float(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ScalarText::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ScalarText::default())
    }
}

impl<'de> Deserialize<'de> for ScalarText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

type ScalarMap = BTreeMap<String, ScalarText>;

/// Serde shape shared by both encodings
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretDocument {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,

    #[serde(default)]
    metadata: ObjectMeta,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    immutable: Option<bool>,

    // Option so that an emptied `data:` (null) still parses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<ScalarMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_data: Option<ScalarMap>,
}

impl SecretDocument {
    fn from_secret(secret: &Secret, data: ScalarMap, string_data: ScalarMap) -> Self {
        Self {
            api_version: secret.api_version.clone(),
            kind: secret.kind.clone(),
            metadata: secret.metadata.clone(),
            type_: secret.type_.clone(),
            immutable: secret.immutable,
            data: non_empty(data),
            string_data: non_empty(string_data),
        }
    }

    fn into_secret(self) -> Result<Secret, ParseError> {
        let mut binary = Vec::new();
        for (key, ScalarText(encoded)) in self.data.unwrap_or_default() {
            let bytes = decode_base64(&encoded).map_err(|source| ParseError::Base64 {
                key: key.clone(),
                source,
            })?;
            binary.push((key, bytes));
        }
        let text = self
            .string_data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, ScalarText(value))| (key, value));

        Ok(Secret {
            api_version: or_default(self.api_version, API_VERSION),
            kind: or_default(self.kind, KIND),
            metadata: self.metadata,
            type_: self.type_,
            immutable: self.immutable,
            payload: Payload::merged(binary, text),
        })
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn non_empty(map: ScalarMap) -> Option<ScalarMap> {
    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

// Wrapped base64 (line breaks, indentation) is accepted.
fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

fn encode_base64(bytes: &[u8]) -> ScalarText {
    ScalarText(STANDARD.encode(bytes))
}

/// Decode a secret as returned by the cluster
pub fn from_wire(bytes: &[u8]) -> Result<Secret, ParseError> {
    let doc: SecretDocument = serde_json::from_slice(bytes)?;
    doc.into_secret()
}

/// Encode a secret for the cluster; every value goes to `data`
pub fn to_wire(secret: &Secret) -> Result<Vec<u8>, ParseError> {
    let data = secret
        .payload
        .iter()
        .map(|(key, value)| (key.clone(), encode_base64(value.as_bytes())))
        .collect();
    let doc = SecretDocument::from_secret(secret, data, ScalarMap::new());
    Ok(serde_json::to_vec(&doc)?)
}

/// Render the editable form of a secret
pub fn to_edit_form(secret: &Secret, header: bool) -> Result<Vec<u8>, ParseError> {
    let mut data = ScalarMap::new();
    let mut string_data = ScalarMap::new();
    for (key, value) in &secret.payload {
        match value {
            SecretValue::Text(text) => {
                string_data.insert(key.clone(), ScalarText(text.clone()));
            }
            SecretValue::Binary(bytes) => {
                data.insert(key.clone(), encode_base64(bytes));
            }
        }
    }

    let doc = SecretDocument::from_secret(secret, data, string_data);
    let yaml = serde_yaml::to_string(&doc)?;

    let mut out = Vec::with_capacity(EDIT_HEADER.len() + yaml.len());
    if header {
        out.extend_from_slice(EDIT_HEADER.as_bytes());
    }
    out.extend_from_slice(yaml.as_bytes());
    Ok(out)
}

/// Parse what the user saved
pub fn from_edit_form(bytes: &[u8]) -> Result<Secret, ParseError> {
    if crate::detect::is_blank(bytes) {
        return Err(ParseError::Empty);
    }
    let doc: SecretDocument = serde_yaml::from_slice(bytes)?;
    doc.into_secret()
}
