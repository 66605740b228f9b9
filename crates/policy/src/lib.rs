//! Warden policy engine.
//!
//! Evaluates an ordered set of compliance rules against an enriched request
//! context and produces a single decision.
//!
//! Precedence and determinism:
//! 1) Rules are considered in ascending `priority` (stable tie-break on
//!    declaration order).
//! 2) Disabled rules are skipped but still appear in the trace.
//! 3) The first matching rule terminates evaluation (FIRST_MATCH).
//! 4) No match ⇒ the policy's `default_effect`.
//!
//! A condition that fails to parse or evaluate is a non-match, never a
//! decision: the failure is recorded in the trace as
//! `Expression evaluation error: <msg>` and evaluation continues. For a
//! given policy and context the outcome is byte-identical across calls.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use warden_core::model::{Effect, Policy, ResidencyRequirement, Rule};

/// One step of the per-request evaluation trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub rule_id: String,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of evaluating a policy against a context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationOutcome {
    pub decision: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub trace: Vec<TraceStep>,
}

/// Evaluate `policy` against `ctx`, first match wins.
pub fn evaluate_policy(policy: &Policy, ctx: &Value) -> EvaluationOutcome {
    let mut ordered: Vec<&Rule> = policy.rules.iter().collect();
    ordered.sort_by_key(|r| r.priority);

    let mut trace = Vec::with_capacity(ordered.len());
    for rule in ordered {
        if !rule.enabled {
            trace.push(TraceStep {
                rule_id: rule.rule_id.clone(),
                matched: false,
                skipped: true,
                reason: Some("Rule disabled".into()),
            });
            continue;
        }
        match expr::evaluate(&rule.condition, ctx) {
            Ok(true) => {
                trace.push(TraceStep {
                    rule_id: rule.rule_id.clone(),
                    matched: true,
                    skipped: false,
                    reason: None,
                });
                debug!(policy = %policy.policy_id, rule = %rule.rule_id, effect = %rule.effect, "rule matched");
                return EvaluationOutcome {
                    decision: rule.effect,
                    matched_rule: Some(rule.rule_id.clone()),
                    trace,
                };
            }
            Ok(false) => {
                trace.push(TraceStep {
                    rule_id: rule.rule_id.clone(),
                    matched: false,
                    skipped: false,
                    reason: Some("Condition not met".into()),
                });
            }
            Err(e) => {
                trace.push(TraceStep {
                    rule_id: rule.rule_id.clone(),
                    matched: false,
                    skipped: false,
                    reason: Some(format!("Expression evaluation error: {}", e)),
                });
            }
        }
    }

    debug!(policy = %policy.policy_id, effect = %policy.evaluation_strategy.default_effect, "default effect");
    EvaluationOutcome {
        decision: policy.evaluation_strategy.default_effect,
        matched_rule: None,
        trace,
    }
}

/// Resolve the effective residency requirement for a decision.
///
/// Precedence: policy override (when not AUTO), then the matched rule's
/// requirement (when not AUTO), then the policy default, then AUTO.
pub fn resolve_residency(policy: &Policy, matched_rule: Option<&Rule>) -> ResidencyRequirement {
    if let Some(o) = policy.residency_override {
        if o != ResidencyRequirement::Auto {
            return o;
        }
    }
    if let Some(r) = matched_rule.and_then(|r| r.residency_requirement) {
        if r != ResidencyRequirement::Auto {
            return r;
        }
    }
    policy.residency_requirement_default.unwrap_or(ResidencyRequirement::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(id: &str, priority: u32, condition: &str, effect: Effect) -> Rule {
        serde_json::from_value(json!({
            "rule_id": id,
            "title": id,
            "category": "PRIVACY",
            "jurisdiction": "AU",
            "condition": condition,
            "effect": effect,
            "priority": priority,
            "severity": "MEDIUM"
        }))
        .unwrap()
    }

    fn policy(rules: Vec<Rule>) -> Policy {
        serde_json::from_value(json!({
            "policy_id": "p1",
            "version": "v1.0.0",
            "title": "test",
            "jurisdiction": "AU",
            "evaluation_strategy": {
                "order": "ASC_PRIORITY",
                "conflict_resolution": "FIRST_MATCH",
                "default_effect": "ALLOW"
            },
            "rules": rules
        }))
        .unwrap()
    }

    #[test]
    fn lowest_priority_match_wins() {
        let p = policy(vec![
            rule("high", 50, "true", Effect::Block),
            rule("low", 10, "true", Effect::Allow),
        ]);
        let out = evaluate_policy(&p, &json!({}));
        assert_eq!(out.matched_rule.as_deref(), Some("low"));
        assert_eq!(out.decision, Effect::Allow);
    }

    #[test]
    fn residency_precedence_chain() {
        let mut p = policy(vec![rule("r", 10, "true", Effect::Allow)]);
        assert_eq!(resolve_residency(&p, None), ResidencyRequirement::Auto);
        p.residency_requirement_default = Some(ResidencyRequirement::AuOnshore);
        assert_eq!(resolve_residency(&p, None), ResidencyRequirement::AuOnshore);
        let mut r = p.rules[0].clone();
        r.residency_requirement = Some(ResidencyRequirement::AuLocal);
        assert_eq!(resolve_residency(&p, Some(&r)), ResidencyRequirement::AuLocal);
        p.residency_override = Some(ResidencyRequirement::OnPremise);
        assert_eq!(resolve_residency(&p, Some(&r)), ResidencyRequirement::OnPremise);
    }
}
