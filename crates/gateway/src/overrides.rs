//! Human-authorized overrides for gated decisions.

use crate::error::GatewayError;
use crate::AppState;
use routing::RoutingDecision;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use warden_core::model::Effect;

/// Request to bypass a REQUIRE_OVERRIDE decision.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRequest {
    pub policy_id: String,
    pub rule_id: String,
    pub request: Value,
    #[serde(default)]
    pub justification: Option<String>,
    pub actor_role: String,
    #[serde(default)]
    pub actor_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideResponse {
    /// `ALLOW_WITH_OVERRIDE`, or `ROUTE_WITH_OVERRIDE` when the rule routes.
    pub decision: String,
    pub rule_id: String,
    /// Effect persisted to the audit log (ALLOW or ROUTE).
    pub effect_recorded: String,
    pub audit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingDecision>,
}

/// Execute an override. Succeeds iff the rule allows overrides, the actor
/// role is authorized, and a justification is present when required.
pub fn execute_override(
    state: &AppState,
    req: &OverrideRequest,
) -> Result<OverrideResponse, GatewayError> {
    let policy = state.policies().get(&req.policy_id)?;
    let rule = policy.rule(&req.rule_id).ok_or_else(|| {
        GatewayError::NotFound(format!(
            "rule '{}' not found in policy '{}'",
            req.rule_id, req.policy_id
        ))
    })?;

    if !rule.overrides.allowed {
        return Err(GatewayError::OverrideRejected {
            code: "OVERRIDE_NOT_ALLOWED",
            message: format!("rule '{}' does not permit overrides", rule.rule_id),
        });
    }
    if let Some(roles) = &rule.overrides.roles {
        if !roles.iter().any(|r| r == &req.actor_role) {
            return Err(GatewayError::OverrideRejected {
                code: "ROLE_NOT_AUTHORIZED",
                message: format!("role '{}' may not override '{}'", req.actor_role, rule.rule_id),
            });
        }
    }
    let justification = req.justification.as_deref().map(str::trim).unwrap_or("");
    if rule.overrides.require_justification && justification.is_empty() {
        return Err(GatewayError::OverrideRejected {
            code: "JUSTIFICATION_REQUIRED",
            message: format!("rule '{}' requires a justification", rule.rule_id),
        });
    }

    let (decision, recorded) = match rule.effect {
        Effect::Route | Effect::WarnRoute => ("ROUTE_WITH_OVERRIDE", Effect::Route),
        _ => ("ALLOW_WITH_OVERRIDE", Effect::Allow),
    };

    // The audited payload carries the override context, and those fields
    // join the whitelist so the record shows who approved what.
    let mut payload = req.request.clone();
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("override_justification".into(), Value::String(justification.to_string()));
        obj.insert("override_actor_role".into(), Value::String(req.actor_role.clone()));
    }
    let mut audit_fields = rule.audit_log_fields.clone();
    audit_fields.push("override_justification".to_string());
    audit_fields.push("override_actor_role".to_string());

    let entry = state.audit().log_decision(
        req.request.get("org_id").and_then(Value::as_str),
        &rule.rule_id,
        recorded.as_str(),
        req.actor_id.as_deref(),
        &payload,
        &audit_fields,
    )?;
    telemetry::record_decision(&policy.policy_id, recorded.as_str(), Some(&rule.rule_id));
    info!(policy = %policy.policy_id, rule = %rule.rule_id, role = %req.actor_role, "override executed");

    let routing = match rule.route_to.as_deref() {
        Some(pool_id) => {
            let snapshot = state.routes().snapshot();
            match snapshot.pool(pool_id) {
                Some(pool) => {
                    Some(routing::rank(pool, &snapshot.targets_for(pool_id), None)?)
                }
                None => None,
            }
        }
        None => None,
    };

    Ok(OverrideResponse {
        decision: decision.to_string(),
        rule_id: rule.rule_id.clone(),
        effect_recorded: recorded.as_str().to_string(),
        audit_id: entry.id,
        routing,
    })
}
