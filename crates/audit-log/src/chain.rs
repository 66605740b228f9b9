//! Hash-chain derivation for audit entries.

use serde_json::{Map, Value};
use warden_core::audit::AuditEntry;
use warden_core::hash::{canonical_json_bytes, sha256_concat, sha256_hex, CanonError, ZERO_HASH};

/// Chain state carried from the last committed entry.
#[derive(Debug, Clone)]
pub struct Tail {
    pub prev_hash: String,
    pub payload_hash: String,
}

impl Tail {
    /// Genesis: a virtual predecessor with the zero-hash link and no payload.
    pub fn genesis() -> Self {
        Self { prev_hash: ZERO_HASH.to_string(), payload_hash: String::new() }
    }

    /// Tail state after `entry` commits.
    pub fn after(entry: &AuditEntry) -> Self {
        Self { prev_hash: entry.prev_hash.clone(), payload_hash: entry.payload_hash.clone() }
    }
}

/// Salted hash of the canonical payload.
pub fn payload_hash(payload: &Value, salt: &str) -> Result<String, CanonError> {
    let mut bytes = canonical_json_bytes(payload)?;
    bytes.extend_from_slice(salt.as_bytes());
    Ok(sha256_hex(&bytes))
}

/// Chain link: `H(prev.prev_hash || prev.payload_hash || rule_id || effect || timestamp)`.
pub fn chain_hash(tail: &Tail, rule_id: &str, effect: &str, timestamp: &str) -> String {
    sha256_concat(&[&tail.prev_hash, &tail.payload_hash, rule_id, effect, timestamp])
}

/// Per-entry Merkle leaf: `H(id || payload_hash || prev_hash)`.
pub fn merkle_leaf(id: &str, payload_hash: &str, prev_hash: &str) -> String {
    sha256_concat(&[id, payload_hash, prev_hash])
}

/// Split a payload into the whitelisted record and per-field hashes.
///
/// Whitelisted fields are kept verbatim; every other field is dropped from
/// the stored record but leaves a SHA-256 of its serialized form behind so
/// the original value can later be proven without being disclosed.
pub fn redact_payload(
    payload: &Value,
    audit_fields: &[String],
) -> (Map<String, Value>, Map<String, Value>) {
    let mut redacted = Map::new();
    let mut hashed = Map::new();
    if let Some(obj) = payload.as_object() {
        for (key, value) in obj {
            if audit_fields.iter().any(|f| f == key) {
                redacted.insert(key.clone(), value.clone());
            } else {
                let serialized = value.to_string();
                hashed.insert(key.clone(), Value::String(sha256_hex(serialized.as_bytes())));
            }
        }
    }
    (redacted, hashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_hash_depends_on_salt() {
        let payload = json!({"a": 1});
        let h1 = payload_hash(&payload, "salt-one").unwrap();
        let h2 = payload_hash(&payload, "salt-two").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn payload_hash_is_key_order_independent() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(payload_hash(&a, "s").unwrap(), payload_hash(&b, "s").unwrap());
    }

    #[test]
    fn redaction_keeps_whitelist_and_hashes_rest() {
        let payload = json!({"org_id": "acme", "message": "secret", "purpose": "demo"});
        let fields = vec!["org_id".to_string(), "purpose".to_string()];
        let (redacted, hashed) = redact_payload(&payload, &fields);
        assert_eq!(redacted.get("org_id"), Some(&json!("acme")));
        assert_eq!(redacted.get("purpose"), Some(&json!("demo")));
        assert!(redacted.get("message").is_none());
        let h = hashed.get("message").and_then(Value::as_str).unwrap();
        assert_eq!(h.len(), 64);
    }

    #[test]
    fn chain_hash_matches_manual_derivation() {
        let tail = Tail::genesis();
        let h = chain_hash(&tail, "R1", "BLOCK", "2026-01-01T00:00:00Z");
        let manual = sha256_concat(&[ZERO_HASH, "", "R1", "BLOCK", "2026-01-01T00:00:00Z"]);
        assert_eq!(h, manual);
    }
}
