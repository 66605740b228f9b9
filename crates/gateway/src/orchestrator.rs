//! Decision orchestrator: preprocess → evaluate → route → audit → invoke.
//!
//! Per-request state is worker-local; the only cross-request serialization
//! point is the audit chain tail. The request deadline is observed between
//! pipeline steps: once it expires nothing further is persisted and the
//! caller receives a timeout.

use crate::connector::ModelResponse;
use crate::error::GatewayError;
use crate::AppState;
use policy::{evaluate_policy, resolve_residency, TraceStep};
use preprocess::{enrich, take_insights, RuleInsight};
use routing::RoutingDecision;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, info_span};
use warden_core::model::{Effect, Policy, ResidencyRequirement, Rule};
use warden_core::routing::RoutingPreference;

/// Per-request deadline, checked between pipeline steps.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Instant,
}

impl Deadline {
    pub fn after_ms(ms: u64) -> Self {
        Self { expires: Instant::now() + Duration::from_millis(ms) }
    }

    /// Error when the deadline has passed, naming the stage about to run.
    pub fn check(&self, stage: &str) -> Result<(), GatewayError> {
        if Instant::now() >= self.expires {
            Err(GatewayError::Timeout(stage.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Override gate attached to REQUIRE_OVERRIDE decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverridesRequired {
    pub roles: Vec<String>,
    pub require_justification: bool,
}

/// Assembled decision response for evaluate and simulate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub decision: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub trace: Vec<TraceStep>,
    pub obligations_applied: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_to: Option<String>,
    pub residency_requirement: ResidencyRequirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_required: Option<OverridesRequired>,
    pub rule_insights: Vec<RuleInsight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_response: Option<ModelResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
}

/// Full pipeline: enrich, evaluate, route, append to the audit log and
/// (optionally) invoke the model connector.
pub fn decide(
    state: &AppState,
    policy_id: &str,
    request: &Value,
    actor_id: Option<&str>,
    deadline: Deadline,
) -> Result<SimulationResult, GatewayError> {
    run_pipeline(state, policy_id, request, actor_id, deadline, true)
}

/// Same pipeline without persistence or model invocation.
pub fn simulate(
    state: &AppState,
    policy_id: &str,
    request: &Value,
    deadline: Deadline,
) -> Result<SimulationResult, GatewayError> {
    run_pipeline(state, policy_id, request, None, deadline, false)
}

fn run_pipeline(
    state: &AppState,
    policy_id: &str,
    request: &Value,
    actor_id: Option<&str>,
    deadline: Deadline,
    persist: bool,
) -> Result<SimulationResult, GatewayError> {
    let policy = state.policies().get(policy_id)?;
    let _span = info_span!("decision", policy = %policy_id, persist).entered();

    deadline.check("preprocess")?;
    let enriched = enrich(request);

    deadline.check("evaluate")?;
    let outcome = evaluate_policy(&policy, &enriched);
    let matched_rule = outcome.matched_rule.as_deref().and_then(|id| policy.rule(id));

    let mut result = assemble(&policy, matched_rule, &outcome, &enriched);

    if result.decision.is_executable() {
        deadline.check("routing")?;
        result.routing = rank_for_decision(state, result.route_to.as_deref(), request)?;
    }

    if persist {
        deadline.check("audit")?;
        let audit_fields = matched_rule.map(|r| r.audit_log_fields.clone()).unwrap_or_default();
        let rule_id = outcome.matched_rule.as_deref().unwrap_or("POLICY_DEFAULT");
        let entry = state.audit().log_decision(
            request.get("org_id").and_then(Value::as_str),
            rule_id,
            result.decision.as_str(),
            actor_id,
            request,
            &audit_fields,
        )?;
        result.audit_id = Some(entry.id);
        telemetry::record_decision(
            policy_id,
            result.decision.as_str(),
            outcome.matched_rule.as_deref(),
        );
        info!(policy = %policy_id, decision = %result.decision, rule = ?outcome.matched_rule, "decision recorded");

        if state.config().stub_responses {
            if let Some(selected) = result.routing.as_ref().and_then(|r| r.selected()) {
                // Invocation happens after the audit entry committed and
                // holds no shared locks.
                result.model_response = Some(state.connector().invoke(selected, request)?);
            }
        }
    }

    Ok(result)
}

fn assemble(
    policy: &Policy,
    matched_rule: Option<&Rule>,
    outcome: &policy::EvaluationOutcome,
    enriched: &Value,
) -> SimulationResult {
    let mut insights = take_insights(enriched);
    if let Some(matched) = outcome.matched_rule.as_deref() {
        for insight in &mut insights {
            if insight.rule_id == matched {
                insight.matched = true;
            }
        }
    }

    let overrides_required = match (outcome.decision, matched_rule) {
        (Effect::RequireOverride, Some(rule)) => Some(OverridesRequired {
            roles: rule.overrides.roles.clone().unwrap_or_default(),
            require_justification: rule.overrides.require_justification,
        }),
        _ => None,
    };

    SimulationResult {
        decision: outcome.decision,
        matched_rule: outcome.matched_rule.clone(),
        trace: outcome.trace.clone(),
        obligations_applied: matched_rule.map(|r| r.obligations.clone()).unwrap_or_default(),
        route_to: matched_rule.and_then(|r| r.route_to.clone()),
        residency_requirement: resolve_residency(policy, matched_rule),
        overrides_required,
        rule_insights: insights,
        routing: None,
        model_response: None,
        audit_id: None,
    }
}

/// Rank the pool for an executable decision.
///
/// Pool precedence: the matched rule's `route_to`, then the configured
/// default pool. With neither, the decision passes through without a
/// routing section. A named pool that cannot produce candidates is a
/// routing failure.
fn rank_for_decision(
    state: &AppState,
    route_to: Option<&str>,
    request: &Value,
) -> Result<Option<RoutingDecision>, GatewayError> {
    let config = state.config();
    let pool_id = match route_to.or(config.default_model_pool.as_deref()) {
        Some(p) => p.to_string(),
        None => return Ok(None),
    };
    let snapshot = state.routes().snapshot();
    let pool = snapshot
        .pool(&pool_id)
        .ok_or_else(|| GatewayError::Routing(format!("pool '{}' not found", pool_id)))?;
    let preferences: Option<RoutingPreference> = request
        .get("routing_preferences")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());
    let targets = snapshot.targets_for(&pool_id);
    let decision = routing::rank(pool, &targets, preferences.as_ref())?;
    Ok(Some(decision))
}

/// One embedded rule test outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTestOutcome {
    pub name: String,
    pub expected: Effect,
    pub actual: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub pass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTestReport {
    pub pass: bool,
    pub results: Vec<RuleTestOutcome>,
}

/// Run a rule's embedded tests, plus an optional ad hoc request which
/// passes when this rule is the one that matches.
pub fn run_rule_tests(
    policy: &Policy,
    rule_id: &str,
    ad_hoc: Option<&Value>,
) -> Result<RuleTestReport, GatewayError> {
    let rule = policy.rule(rule_id).ok_or_else(|| {
        GatewayError::NotFound(format!(
            "rule '{}' not found in policy '{}'",
            rule_id, policy.policy_id
        ))
    })?;

    let mut results = Vec::new();
    for test in &rule.tests {
        let outcome = evaluate_policy(policy, &enrich(&test.request));
        results.push(RuleTestOutcome {
            name: test.name.clone(),
            expected: test.expect,
            actual: outcome.decision,
            pass: outcome.decision == test.expect,
            matched_rule: outcome.matched_rule,
        });
    }
    if let Some(request) = ad_hoc {
        let outcome = evaluate_policy(policy, &enrich(request));
        results.push(RuleTestOutcome {
            name: "ad_hoc_request".into(),
            expected: rule.effect,
            actual: outcome.decision,
            pass: outcome.matched_rule.as_deref() == Some(rule_id),
            matched_rule: outcome.matched_rule,
        });
    }
    Ok(RuleTestReport { pass: results.iter().all(|r| r.pass), results })
}
