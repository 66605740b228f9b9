//! HTTP surface: axum router and typed handlers.

use crate::auth::{AuthContext, Capability};
use crate::connector::ModelResponse;
use crate::error::GatewayError;
use crate::orchestrator::{self, Deadline, RuleTestReport, SimulationResult};
use crate::overrides::{self, OverrideRequest, OverrideResponse};
use crate::AppState;
use audit_log::{AuditFilter, IntegrityReport, LatestProof};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use routing::RoutingDecision;
use serde::Deserialize;
use serde_json::{json, Value};
use warden_core::audit::AuditEntry;
use warden_core::model::Policy;
use warden_core::routing::{HealthStatus, ModelPool, RouteTarget, RoutingPreference};
use warden_core::schema::validate_policy;

/// Assemble the full API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/evaluate", post(evaluate))
        .route("/api/evaluate/simulate", post(simulate))
        .route("/api/overrides/execute", post(overrides_execute))
        .route("/api/policies", get(list_policies))
        .route("/api/policies/import", post(import_policy))
        .route(
            "/api/policies/:id",
            get(get_policy).put(put_policy).delete(delete_policy),
        )
        .route("/api/policies/:id/validate", post(validate_policy_doc))
        .route("/api/policies/:id/rules/:rid/test", post(test_rule))
        .route("/api/audit", get(list_audit))
        .route("/api/audit/proof/latest", get(audit_proof))
        .route("/api/audit/verify", post(audit_verify))
        .route("/api/audit/:id", get(get_audit))
        .route("/api/routes/pools", get(list_pools))
        .route("/api/routes/targets", get(list_targets))
        .route("/api/routes/pools/:id/targets", get(pool_targets))
        .route("/api/routes/metrics/summary", get(metrics_summary))
        .route("/api/routes/metrics/paths", get(metrics_paths))
        .route("/api/routes/pools/:id/preview-ranking", post(preview_ranking))
        .route("/api/routes/execute", post(routes_execute))
        .with_state(state)
}

/// Per-request deadline: the `x-request-timeout-ms` header may tighten the
/// configured ceiling, never extend it.
fn deadline_for(state: &AppState, headers: &HeaderMap) -> Deadline {
    let ceiling = state.config().request_timeout_ms;
    let requested = headers
        .get("x-request-timeout-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(ceiling);
    Deadline::after_ms(requested.min(ceiling))
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    policy_id: String,
    request: Value,
}

async fn evaluate(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<SimulationResult>, GatewayError> {
    let deadline = deadline_for(&state, &headers);
    let result = orchestrator::decide(
        &state,
        &body.policy_id,
        &body.request,
        auth.actor_id.as_deref(),
        deadline,
    )?;
    Ok(Json(result))
}

async fn simulate(
    State(state): State<AppState>,
    _auth: AuthContext,
    headers: HeaderMap,
    Json(body): Json<EvaluateRequest>,
) -> Result<Json<SimulationResult>, GatewayError> {
    let deadline = deadline_for(&state, &headers);
    let result = orchestrator::simulate(&state, &body.policy_id, &body.request, deadline)?;
    Ok(Json(result))
}

async fn overrides_execute(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<OverrideRequest>,
) -> Result<Json<OverrideResponse>, GatewayError> {
    auth.require(Capability::ManageOverrides)?;
    Ok(Json(overrides::execute_override(&state, &body)?))
}

async fn list_policies(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<Vec<Policy>> {
    let policies = state.policies().list().iter().map(|p| (**p).clone()).collect();
    Json(policies)
}

async fn get_policy(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Policy>, GatewayError> {
    Ok(Json((*state.policies().get(&id)?).clone()))
}

async fn import_policy(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(doc): Json<Value>,
) -> Result<Json<Policy>, GatewayError> {
    auth.require(Capability::PublishRules)?;
    let policy = validate_policy(&doc).map_err(GatewayError::Validation)?;
    state.policies().insert(policy.clone())?;
    Ok(Json(policy))
}

async fn put_policy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(doc): Json<Value>,
) -> Result<Json<Policy>, GatewayError> {
    auth.require(Capability::PublishRules)?;
    let policy = validate_policy(&doc).map_err(GatewayError::Validation)?;
    if policy.policy_id != id {
        return Err(GatewayError::Validation(vec![warden_core::schema::ValidationIssue {
            path: "/policy_id".into(),
            message: format!("body policy_id '{}' does not match path '{}'", policy.policy_id, id),
        }]));
    }
    state.policies().replace(policy.clone())?;
    Ok(Json(policy))
}

async fn delete_policy(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, GatewayError> {
    auth.require(Capability::ManageSettings)?;
    state.policies().remove(&id)?;
    Ok(Json(json!({"success": true})))
}

async fn validate_policy_doc(
    State(_state): State<AppState>,
    _auth: AuthContext,
    Path(_id): Path<String>,
    Json(doc): Json<Value>,
) -> Json<Value> {
    match validate_policy(&doc) {
        Ok(_) => Json(json!({"valid": true, "errors": []})),
        Err(issues) => Json(json!({"valid": false, "errors": issues})),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RuleTestBody {
    #[serde(default)]
    request: Option<Value>,
}

async fn test_rule(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, rid)): Path<(String, String)>,
    Json(body): Json<RuleTestBody>,
) -> Result<Json<RuleTestReport>, GatewayError> {
    auth.require(Capability::Simulate)?;
    let policy = state.policies().get(&id)?;
    Ok(Json(orchestrator::run_rule_tests(&policy, &rid, body.request.as_ref())?))
}

async fn list_audit(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(filter): Query<AuditFilter>,
) -> Json<Vec<AuditEntry>> {
    Json(state.audit().list(&filter))
}

async fn get_audit(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<AuditEntry>, GatewayError> {
    Ok(Json(state.audit().get_by_id(&id)?))
}

async fn audit_proof(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> Json<LatestProof> {
    Json(state.audit().latest_proof())
}

async fn audit_verify(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<IntegrityReport>, GatewayError> {
    auth.require(Capability::ManageSettings)?;
    Ok(Json(state.audit().verify_integrity()))
}

async fn list_pools(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<ModelPool>>, GatewayError> {
    auth.require(Capability::Read)?;
    Ok(Json(state.routes().snapshot().pools.clone()))
}

async fn list_targets(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<RouteTarget>>, GatewayError> {
    auth.require(Capability::Read)?;
    Ok(Json(state.routes().snapshot().targets.clone()))
}

async fn pool_targets(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<RouteTarget>>, GatewayError> {
    auth.require(Capability::Read)?;
    state.routes().pool(&id)?;
    Ok(Json(state.routes().snapshot().targets_for(&id)))
}

async fn metrics_summary(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Value>, GatewayError> {
    auth.require(Capability::Read)?;
    let snapshot = state.routes().snapshot();
    let healthy = snapshot
        .pools
        .iter()
        .filter(|p| p.health.status == HealthStatus::Healthy)
        .count();
    Ok(Json(json!({
        "pools": snapshot.pools.len(),
        "healthy_pools": healthy,
        "targets": snapshot.targets.len(),
        "active_targets": snapshot.targets.iter().filter(|t| t.is_active).count(),
        "audit_entries": state.audit().len(),
        "decisions": telemetry::decision_metrics().snapshot(),
    })))
}

async fn metrics_paths(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Value>, GatewayError> {
    auth.require(Capability::Read)?;
    let snapshot = state.routes().snapshot();
    let paths: Vec<Value> = snapshot
        .pools
        .iter()
        .map(|pool| {
            let targets: Vec<Value> = snapshot
                .targets_for(&pool.pool_id)
                .iter()
                .map(|t| {
                    json!({
                        "target_id": t.id,
                        "provider": t.provider,
                        "region": t.region,
                        "weight": t.weight,
                        "is_active": t.is_active,
                    })
                })
                .collect();
            json!({
                "pool_id": pool.pool_id,
                "region": pool.region,
                "health": pool.health.status,
                "targets": targets,
            })
        })
        .collect();
    Ok(Json(json!({ "paths": paths })))
}

#[derive(Debug, Default, Deserialize)]
struct PreviewRankingBody {
    #[serde(default)]
    preferences: Option<RoutingPreference>,
}

async fn preview_ranking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<PreviewRankingBody>,
) -> Result<Json<RoutingDecision>, GatewayError> {
    auth.require(Capability::Read)?;
    let pool = state.routes().pool(&id)?;
    let targets = state.routes().snapshot().targets_for(&id);
    Ok(Json(routing::rank(&pool, &targets, body.preferences.as_ref())?))
}

#[derive(Debug, Deserialize)]
struct RoutingRequest {
    #[serde(default)]
    pool_id: Option<String>,
    #[serde(default)]
    preferences: Option<RoutingPreference>,
    #[serde(default)]
    request: Option<Value>,
}

#[derive(Debug, serde::Serialize)]
struct RoutingResponse {
    routing: RoutingDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_response: Option<ModelResponse>,
}

async fn routes_execute(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(body): Json<RoutingRequest>,
) -> Result<Json<RoutingResponse>, GatewayError> {
    let pool_id = body
        .pool_id
        .clone()
        .or_else(|| state.config().default_model_pool.clone())
        .ok_or_else(|| GatewayError::Routing("no pool requested and no default pool".into()))?;
    let snapshot = state.routes().snapshot();
    let pool = snapshot
        .pool(&pool_id)
        .ok_or_else(|| GatewayError::Routing(format!("pool '{}' not found", pool_id)))?;
    let decision = routing::rank(pool, &snapshot.targets_for(&pool_id), body.preferences.as_ref())?;

    let model_response = if state.config().stub_responses {
        let request = body.request.clone().unwrap_or_else(|| json!({}));
        decision
            .selected()
            .map(|target| state.connector().invoke(target, &request))
            .transpose()?
    } else {
        None
    };

    Ok(Json(RoutingResponse { routing: decision, model_response }))
}
