//! Warden core primitives and shared types.

#![deny(unsafe_code)]

pub mod context;
pub mod hash;
pub mod model;
pub mod routing;
pub mod schema;

/// Version of the warden core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ids {
    //! ID utilities: entry ids and trace ids.

    use uuid::Uuid;

    /// Opaque entry identifier (UUID v4 string).
    pub fn new_entry_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Opaque trace identifier (UUID v4 string).
    pub fn new_trace_id() -> String {
        Uuid::new_v4().to_string()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn entry_id_format() {
            let t = new_entry_id();
            assert_eq!(t.len(), 36);
            assert!(t.chars().all(|c| c.is_ascii_hexdigit() || c == '-'));
        }
    }
}

pub mod audit {
    //! Audit entry schema shared between the log, the gateway and the CLI.

    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    /// One committed entry of the tamper-evident decision log.
    ///
    /// Entries are append-only; `prev_hash` links each entry to its
    /// predecessor and `merkle_leaf` feeds the log-wide Merkle root.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct AuditEntry {
        /// Unique entry id (UUID v4).
        pub id: String,
        /// RFC 3339 UTC timestamp assigned at append time.
        pub timestamp: String,
        /// Originating organisation, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub org_id: Option<String>,
        /// Rule that produced the decision (or the policy default marker).
        pub rule_id: String,
        /// Decision effect as persisted (overrides are mapped to ALLOW/ROUTE).
        pub effect: String,
        /// Acting principal, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub actor_id: Option<String>,
        /// Payload restricted to the rule's `audit_log_fields` whitelist.
        pub redacted_payload: Map<String, Value>,
        /// SHA-256 over the serialized form of every non-whitelisted field.
        pub fields_hashed: Map<String, Value>,
        /// SHA-256 of the salted canonical payload.
        pub payload_hash: String,
        /// Chain link derived from the previous entry.
        pub prev_hash: String,
        /// Per-entry Merkle leaf.
        pub merkle_leaf: String,
    }
}
