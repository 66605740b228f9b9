//! Model pool, target and routing-preference schema.

use crate::model::ResidencyRequirement;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Health of a pool as reported by the out-of-band checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolHealth {
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl Default for PoolHealth {
    fn default() -> Self {
        Self { status: HealthStatus::Healthy, last_check: None, errors: None }
    }
}

/// A group of model endpoints sharing region, tags and health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPool {
    pub pool_id: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub health: PoolHealth,
}

/// Compliance facts about a deployed model endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComplianceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_residency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_latency_ms: Option<f64>,
    /// Fraction in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_tps: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CostInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_1k_tokens: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LimitsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
}

/// Coarse capability tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStrength {
    Lite,
    Standard,
    Strong,
}

impl ModelStrength {
    /// Ordering rank used by the scorer: strong=3, standard=2, lite=1.
    pub fn rank(self) -> i64 {
        match self {
            ModelStrength::Strong => 3,
            ModelStrength::Standard => 2,
            ModelStrength::Lite => 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QualityInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<ModelStrength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Structured performance/compliance/cost/limits metadata for a target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelProfile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_data_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityInfo>,
    /// Free-form tags (`deployment`, `cost_tier`, `info_types`, feature flags).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tags: Map<String, Value>,
}

impl ModelProfile {
    /// String value of a tag, when present and a string.
    pub fn tag_str(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(|v| v.as_str())
    }

    /// True when the tag exists and is boolean `true`.
    pub fn tag_flag(&self, key: &str) -> bool {
        self.tags.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// A single model endpoint with weight and optional profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteTarget {
    pub id: String,
    pub pool_id: String,
    pub provider: String,
    pub endpoint: String,
    pub weight: f64,
    pub region: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ModelProfile>,
}

fn default_active() -> bool {
    true
}

/// Caller preferences ranked against candidate targets by the scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub minimize_latency: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compliance_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_context_window_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_strength: Option<ModelStrength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_data_residency: Option<ResidencyRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_data_residency: Vec<ResidencyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_budget_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_per_1k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_output_tokens: Option<u64>,
    #[serde(default)]
    pub requires_json_mode: bool,
    #[serde(default)]
    pub requires_function_calling: bool,
    #[serde(default)]
    pub requires_streaming: bool,
    #[serde(default)]
    pub requires_vision: bool,
    #[serde(default)]
    pub requires_on_prem: bool,
}
