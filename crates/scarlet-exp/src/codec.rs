//! Byte-level encodings shared by the store, the scene provider and the
//! configuration loader.

use scarlet_core::{ErrorInfo, HarnessError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

fn codec_error(code: &str, err: impl ToString) -> HarnessError {
    HarnessError::Serde(ErrorInfo::new(code, err.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => items.into_iter().map(sort_keys).collect(),
        other => other,
    }
}

/// JSON encoding with object keys sorted at every depth. Equal values always
/// produce equal bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HarnessError> {
    let value = serde_json::to_value(value).map_err(|err| codec_error("canonical-encode", err))?;
    serde_json::to_vec(&sort_keys(value)).map_err(|err| codec_error("canonical-write", err))
}

/// Lowercase hex SHA-256 of the canonical JSON form; identifies the exact
/// scene a record was measured on.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, HarnessError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{:x}", digest))
}

pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, HarnessError> {
    serde_json::from_slice(data).map_err(|err| codec_error("json-decode", err))
}

pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, HarnessError> {
    serde_yaml::from_slice(data).map_err(|err| codec_error("yaml-decode", err))
}
