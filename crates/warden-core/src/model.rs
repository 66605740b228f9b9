//! Policy and rule model: the compliance vocabulary shared by every crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Decision outcome for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// Proceed unchanged.
    Allow,
    /// Refuse the request.
    Block,
    /// Proceed via the rule's designated pool.
    Route,
    /// Gate the request behind a human-authorized override.
    RequireOverride,
    /// Proceed via the designated pool, flagged for review.
    WarnRoute,
}

impl Effect {
    /// True when the decision permits model execution without an override.
    pub fn is_executable(self) -> bool {
        matches!(self, Effect::Allow | Effect::Route | Effect::WarnRoute)
    }

    /// Wire string for the effect, matching the serde rendering.
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "ALLOW",
            Effect::Block => "BLOCK",
            Effect::Route => "ROUTE",
            Effect::RequireOverride => "REQUIRE_OVERRIDE",
            Effect::WarnRoute => "WARN_ROUTE",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to a rule for reporting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Regulatory category a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Privacy,
    Health,
    AiRisk,
    Cdr,
    AntiDiscrim,
    Telecom,
    Copyright,
    Export,
    Consumer,
}

/// Where a decision's model execution is allowed to reside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidencyRequirement {
    /// No constraint; the router decides.
    Auto,
    /// Data must stay with AU-resident endpoints.
    AuOnshore,
    /// AU-resident and locally deployed (onsite/onprem) endpoints only.
    AuLocal,
    /// On-premise deployments only, regardless of region.
    OnPremise,
}

/// Optional scope filter restricting which requests a rule applies to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppliesTo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub org_ids: Vec<String>,
}

/// Whether and how a gated decision may be overridden by a human actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverridePolicy {
    /// When false, no override is possible for this rule.
    #[serde(default)]
    pub allowed: bool,
    /// Roles permitted to override; `None` means any authenticated role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// When true, a non-empty justification must accompany the override.
    #[serde(default)]
    pub require_justification: bool,
}

/// An embedded rule self-test: a request payload and the expected decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleTest {
    pub name: String,
    pub request: Value,
    pub expect: Effect,
}

/// Free-form ownership metadata carried on a rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A single compliance rule: a named condition producing an effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    /// Stable identifier, unique within the containing policy.
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: Category,
    pub jurisdiction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal_basis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applies_to: Option<AppliesTo>,
    /// Boolean condition in the restricted expression language. Never empty.
    pub condition: String,
    pub effect: Effect,
    /// Pool identifier for ROUTE / WARN_ROUTE effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<String>,
    /// Payload fields retained verbatim in the audit record.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audit_log_fields: Vec<String>,
    #[serde(default)]
    pub overrides: OverridePolicy,
    /// Evaluation order: lower priority evaluates earlier.
    pub priority: u32,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency_requirement: Option<ResidencyRequirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<RuleTest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RuleMetadata>,
}

/// How a policy's rules are combined into one decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationStrategy {
    /// Rule ordering; the engine supports `ASC_PRIORITY`.
    pub order: String,
    /// Conflict handling; the engine supports `FIRST_MATCH`.
    pub conflict_resolution: String,
    /// Effect returned when no enabled rule matches.
    pub default_effect: Effect,
}

/// An ordered, versioned set of rules plus evaluation strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Policy {
    pub policy_id: String,
    /// Semantic version of the shape `vMAJOR.MINOR.PATCH`.
    pub version: String,
    pub title: String,
    pub jurisdiction: String,
    pub evaluation_strategy: EvaluationStrategy,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency_requirement_default: Option<ResidencyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency_override: Option<ResidencyRequirement>,
}

impl Policy {
    /// Look up a rule by id.
    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.rule_id == rule_id)
    }
}
