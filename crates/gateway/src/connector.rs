//! Model connector seam.
//!
//! Live provider adapters live outside the core; the gateway only needs the
//! invocation seam and a deterministic stub for environments without a
//! configured connector. Invocation happens after the decision is emitted
//! and the audit entry committed, and holds no shared locks.

use crate::error::GatewayError;
use routing::ScoredCandidate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_core::hash::sha256_canonical_json;

/// Response handed back from a model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    pub provider: String,
    pub target_id: String,
    pub content: String,
    /// True when produced by the stub rather than a live endpoint.
    pub stub: bool,
}

/// Seam to a model endpoint. May block; must not hold shared state.
pub trait ModelConnector: Send + Sync {
    fn invoke(
        &self,
        target: &ScoredCandidate,
        request: &Value,
    ) -> Result<ModelResponse, GatewayError>;
}

/// Deterministic stand-in used when no live connector is configured.
pub struct StubConnector;

impl ModelConnector for StubConnector {
    fn invoke(
        &self,
        target: &ScoredCandidate,
        request: &Value,
    ) -> Result<ModelResponse, GatewayError> {
        let digest = sha256_canonical_json(request)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(ModelResponse {
            provider: target.provider.clone(),
            target_id: target.target_id.clone(),
            content: format!("stub-response:{}", &digest[..16]),
            stub: true,
        })
    }
}
