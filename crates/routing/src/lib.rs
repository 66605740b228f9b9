//! Routing scorer: ranks a pool's active targets against caller preferences.
//!
//! Scores are additive over the target weight. Disqualifying penalties
//! (residency mismatch, missing on-prem, blown cost cap, missing features)
//! are large negatives rather than exclusions so the candidate stays in the
//! ranking and the caller can observe why it lost. Ranking is stable: ties
//! keep the original target order, and the top candidate is flagged
//! `selected`.

#![deny(unsafe_code)]

mod score;

pub use score::score_target;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warden_core::routing::{ModelPool, RouteTarget, RoutingPreference};

/// Errors from the routing layer.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("pool '{0}' has no active targets")]
    NoActiveTargets(String),
}

/// One ranked candidate endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    pub target_id: String,
    pub provider: String,
    pub endpoint: String,
    pub region: String,
    pub weight: f64,
    pub score: f64,
    pub reasons: Vec<String>,
    pub selected: bool,
}

/// Ranking outcome for a pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingDecision {
    pub pool_id: String,
    pub pool_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_description: Option<String>,
    pub candidates: Vec<ScoredCandidate>,
}

impl RoutingDecision {
    /// The winning candidate. Present whenever ranking succeeded.
    pub fn selected(&self) -> Option<&ScoredCandidate> {
        self.candidates.iter().find(|c| c.selected)
    }
}

/// Rank the pool's active targets. Targets marked inactive are not scored.
pub fn rank(
    pool: &ModelPool,
    targets: &[RouteTarget],
    preferences: Option<&RoutingPreference>,
) -> Result<RoutingDecision, RoutingError> {
    let default_prefs = RoutingPreference::default();
    let prefs = preferences.unwrap_or(&default_prefs);

    let mut candidates: Vec<ScoredCandidate> = targets
        .iter()
        .filter(|t| t.is_active && t.pool_id == pool.pool_id)
        .map(|t| {
            let (score, reasons) = score_target(t, prefs);
            ScoredCandidate {
                target_id: t.id.clone(),
                provider: t.provider.clone(),
                endpoint: t.endpoint.clone(),
                region: t.region.clone(),
                weight: t.weight,
                score,
                reasons,
                selected: false,
            }
        })
        .collect();

    if candidates.is_empty() {
        return Err(RoutingError::NoActiveTargets(pool.pool_id.clone()));
    }

    // Stable sort keeps original order on equal scores.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates[0].selected = true;
    debug!(pool = %pool.pool_id, winner = %candidates[0].target_id, score = candidates[0].score, "ranked pool");

    Ok(RoutingDecision {
        pool_id: pool.pool_id.clone(),
        pool_region: pool.region.clone(),
        pool_description: pool.description.clone(),
        candidates,
    })
}
