//! Tamper-evident decision audit log.
//!
//! Entries are append-only and hash-chained: each entry's `prev_hash` is
//! derived from the previous entry's chain state plus this entry's rule,
//! effect and timestamp, so reordering, deletion or mutation of any
//! committed entry is detectable by [`AuditLog::verify_integrity`]. Every
//! entry also carries a Merkle leaf; [`AuditLog::latest_proof`] exposes the
//! current root over all leaves (recomputed on demand, cached until the
//! next append).
//!
//! The chain tail is guarded by a single mutex so entries are strictly
//! linearly ordered; appends are O(1) plus hashing. Readers of committed
//! entries never take the tail lock. When a JSONL path is configured the
//! row is written and flushed before the append is acknowledged.

#![deny(unsafe_code)]

mod chain;
mod merkle;

pub use chain::{chain_hash, merkle_leaf, payload_hash, redact_payload, Tail};
pub use merkle::merkle_root;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;
use tracing::debug;
use warden_core::audit::AuditEntry;
use warden_core::ids::new_entry_id;

/// Errors emitted by the audit log.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("canonical json: {0}")]
    Canon(#[from] warden_core::hash::CanonError),
    #[error("audit entry not found: {0}")]
    NotFound(String),
}

/// Listing filter; all fields optional and conjunctive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub from: Option<String>,
    pub to: Option<String>,
    pub org_id: Option<String>,
    pub rule_id: Option<String>,
    pub effect: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Snapshot proof over the whole log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestProof {
    pub merkle_root: String,
    pub height: u32,
    /// Index of the newest entry; -1 when the log is empty.
    pub last_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntegrityReport {
    pub valid: bool,
    pub errors: Vec<IntegrityError>,
}

struct ChainState {
    tail: Tail,
    file: Option<File>,
}

/// The append-only audit log.
pub struct AuditLog {
    salt: String,
    chain: Mutex<ChainState>,
    entries: RwLock<Vec<AuditEntry>>,
    proof_cache: Mutex<Option<LatestProof>>,
}

impl AuditLog {
    /// In-memory log (no persistence). The salt participates in every
    /// payload hash.
    pub fn in_memory(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            chain: Mutex::new(ChainState { tail: Tail::genesis(), file: None }),
            entries: RwLock::new(Vec::new()),
            proof_cache: Mutex::new(None),
        }
    }

    /// Open a JSONL-backed log, replaying any existing rows to rebuild the
    /// chain tail.
    pub fn open(salt: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let mut entries = Vec::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                if line.is_empty() {
                    continue;
                }
                let entry: AuditEntry = serde_json::from_str(&line)?;
                entries.push(entry);
            }
        }
        let tail = entries.last().map(Tail::after).unwrap_or_else(Tail::genesis);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            salt: salt.into(),
            chain: Mutex::new(ChainState { tail, file: Some(file) }),
            entries: RwLock::new(entries),
            proof_cache: Mutex::new(None),
        })
    }

    /// Append a decision. Fatal on persistence failure: the entry is not
    /// acknowledged and the chain tail is left unchanged.
    pub fn log_decision(
        &self,
        org_id: Option<&str>,
        rule_id: &str,
        effect: &str,
        actor_id: Option<&str>,
        payload: &Value,
        audit_fields: &[String],
    ) -> Result<AuditEntry, AuditError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.log_decision_at(&timestamp, org_id, rule_id, effect, actor_id, payload, audit_fields)
    }

    /// Append with an explicit timestamp. Exposed for deterministic tests;
    /// production callers use [`Self::log_decision`].
    #[allow(clippy::too_many_arguments)]
    pub fn log_decision_at(
        &self,
        timestamp: &str,
        org_id: Option<&str>,
        rule_id: &str,
        effect: &str,
        actor_id: Option<&str>,
        payload: &Value,
        audit_fields: &[String],
    ) -> Result<AuditEntry, AuditError> {
        let (redacted_payload, fields_hashed) = redact_payload(payload, audit_fields);
        let payload_hash = payload_hash(payload, &self.salt)?;

        // The tail lock serializes hashing and persistence so the chain
        // order is exactly the append order.
        let mut chain = self.chain.lock().expect("audit chain poisoned");
        let prev_hash = chain_hash(&chain.tail, rule_id, effect, timestamp);
        let id = new_entry_id();
        let entry = AuditEntry {
            merkle_leaf: merkle_leaf(&id, &payload_hash, &prev_hash),
            id,
            timestamp: timestamp.to_string(),
            org_id: org_id.map(str::to_string),
            rule_id: rule_id.to_string(),
            effect: effect.to_string(),
            actor_id: actor_id.map(str::to_string),
            redacted_payload,
            fields_hashed,
            payload_hash,
            prev_hash,
        };

        if let Some(file) = chain.file.as_mut() {
            let line = serde_json::to_string(&entry)?;
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()?;
        }
        chain.tail = Tail::after(&entry);
        self.entries.write().expect("audit entries poisoned").push(entry.clone());
        *self.proof_cache.lock().expect("proof cache poisoned") = None;
        debug!(rule = rule_id, effect, "audit entry committed");
        Ok(entry)
    }

    /// Entries matching the filter, oldest first.
    pub fn list(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        let entries = self.entries.read().expect("audit entries poisoned");
        entries
            .iter()
            .filter(|e| {
                filter.from.as_deref().map(|f| e.timestamp.as_str() >= f).unwrap_or(true)
                    && filter.to.as_deref().map(|t| e.timestamp.as_str() <= t).unwrap_or(true)
                    && filter.org_id.as_deref().map(|o| e.org_id.as_deref() == Some(o)).unwrap_or(true)
                    && filter.rule_id.as_deref().map(|r| e.rule_id == r).unwrap_or(true)
                    && filter.effect.as_deref().map(|x| e.effect == x).unwrap_or(true)
            })
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(100))
            .cloned()
            .collect()
    }

    /// Look up one entry by id.
    pub fn get_by_id(&self, id: &str) -> Result<AuditEntry, AuditError> {
        self.entries
            .read()
            .expect("audit entries poisoned")
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| AuditError::NotFound(id.to_string()))
    }

    /// Number of committed entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("audit entries poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current Merkle root over every committed leaf. Cached until the next
    /// append.
    pub fn latest_proof(&self) -> LatestProof {
        let mut cache = self.proof_cache.lock().expect("proof cache poisoned");
        if let Some(proof) = cache.as_ref() {
            return proof.clone();
        }
        let entries = self.entries.read().expect("audit entries poisoned");
        let leaves: Vec<String> = entries.iter().map(|e| e.merkle_leaf.clone()).collect();
        let (merkle_root, height) = merkle_root(&leaves);
        let proof =
            LatestProof { merkle_root, height, last_index: entries.len() as i64 - 1 };
        *cache = Some(proof.clone());
        proof
    }

    /// Re-derive every chain link and leaf; any divergence is reported with
    /// its entry index.
    pub fn verify_integrity(&self) -> IntegrityReport {
        let entries = self.entries.read().expect("audit entries poisoned");
        verify_entries(&entries)
    }
}

/// Verify a slice of entries taken from any store (in-memory or replayed
/// from JSONL).
pub fn verify_entries(entries: &[AuditEntry]) -> IntegrityReport {
    let mut errors = Vec::new();
    let mut tail = Tail::genesis();
    for (index, entry) in entries.iter().enumerate() {
        let expected_prev =
            chain_hash(&tail, &entry.rule_id, &entry.effect, &entry.timestamp);
        if entry.prev_hash != expected_prev {
            errors.push(IntegrityError {
                index,
                message: format!(
                    "prev_hash mismatch: stored {} expected {}",
                    entry.prev_hash, expected_prev
                ),
            });
        }
        let expected_leaf = merkle_leaf(&entry.id, &entry.payload_hash, &entry.prev_hash);
        if entry.merkle_leaf != expected_leaf {
            errors.push(IntegrityError {
                index,
                message: format!(
                    "merkle_leaf mismatch: stored {} expected {}",
                    entry.merkle_leaf, expected_leaf
                ),
            });
        }
        tail = Tail::after(entry);
    }
    IntegrityReport { valid: errors.is_empty(), errors }
}

/// Read every entry from a persisted JSONL audit file.
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>, AuditError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_links_chain() {
        let log = AuditLog::in_memory("salt");
        let a = log
            .log_decision(None, "R1", "ALLOW", None, &json!({"k": 1}), &[])
            .unwrap();
        let b = log
            .log_decision(None, "R2", "BLOCK", None, &json!({"k": 2}), &[])
            .unwrap();
        let expected = chain_hash(&Tail::after(&a), "R2", "BLOCK", &b.timestamp);
        assert_eq!(b.prev_hash, expected);
        assert!(log.verify_integrity().valid);
    }

    #[test]
    fn proof_cache_invalidated_on_append() {
        let log = AuditLog::in_memory("salt");
        log.log_decision(None, "R1", "ALLOW", None, &json!({}), &[]).unwrap();
        let p1 = log.latest_proof();
        log.log_decision(None, "R1", "ALLOW", None, &json!({}), &[]).unwrap();
        let p2 = log.latest_proof();
        assert_ne!(p1.merkle_root, p2.merkle_root);
        assert_eq!(p2.last_index, 1);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let log = AuditLog::in_memory("salt");
        assert!(matches!(log.get_by_id("nope"), Err(AuditError::NotFound(_))));
    }
}
