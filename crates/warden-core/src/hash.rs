//! Canonical JSON serialization and SHA-256 hashing.
//!
//! Hashes must be computed over canonical bytes: recursively key-sorted
//! objects, compact separators, UTF-8. Never pretty-print before hashing.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Genesis link for the audit chain: 64 hex zeroes.
pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize to canonical JSON bytes with stable key ordering.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let v = serde_json::to_value(value)?;
    let sorted = sort_json_value(v);
    Ok(serde_json::to_vec(&sorted)?)
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Lowercase hex SHA-256 of the canonical JSON of `value`.
pub fn sha256_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    Ok(sha256_hex(&canonical_json_bytes(value)?))
}

/// Hash several string parts concatenated in order.
pub fn sha256_concat(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn sort_json_value(v: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k, sort_json_value(v));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Obj {
        b: u32,
        a: u32,
    }

    #[test]
    fn canonical_hash_is_key_order_independent() {
        let x = json!({"b": 2, "a": 1});
        let y = Obj { b: 2, a: 1 };
        assert_eq!(sha256_canonical_json(&x).unwrap(), sha256_canonical_json(&y).unwrap());
    }

    #[test]
    fn concat_matches_manual_hash() {
        let joined = sha256_hex(b"abc");
        assert_eq!(sha256_concat(&["a", "bc"]), joined);
    }

    #[test]
    fn zero_hash_shape() {
        assert_eq!(ZERO_HASH.len(), 64);
        assert!(ZERO_HASH.bytes().all(|b| b == b'0'));
    }
}
