//! HTTP surface tests: auth envelope, validation and the JSON error shape.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gateway::config::SeedFile;
use gateway::{build_router, AppState, Config};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn seed() -> SeedFile {
    SeedFile::from_yaml(
        r#"
policies:
  - policy_id: au-core
    version: v1.0.0
    title: AU core
    jurisdiction: AU
    evaluation_strategy:
      order: ASC_PRIORITY
      conflict_resolution: FIRST_MATCH
      default_effect: ALLOW
    rules: []
pools:
  - pool_id: general
    region: AU
targets:
  - id: t1
    pool_id: general
    provider: openai
    endpoint: https://example.invalid/v1
    weight: 10.0
    region: AU
"#,
    )
    .unwrap()
}

fn secured_router() -> Router {
    let config = Config { jwt_secret: SECRET.into(), ..Config::default() };
    let state = AppState::in_memory(config);
    state.apply_seed(seed()).unwrap();
    build_router(state)
}

fn open_router() -> Router {
    let state = AppState::in_memory(Config::default());
    state.apply_seed(seed()).unwrap();
    build_router(state)
}

fn token(role: &str) -> String {
    encode(
        &Header::default(),
        &json!({"sub": "tester", "role": role, "exp": 4102444800u64}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let response = secured_router()
        .oneshot(get("/api/policies", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn analyst_cannot_delete_policies() {
    let response = secured_router()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/policies/au-core")
                .header(header::AUTHORIZATION, format!("Bearer {}", token("analyst")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn admin_manages_policy_lifecycle() {
    let router = secured_router();
    let admin = token("admin");

    let doc = json!({
        "policy_id": "au-extra",
        "version": "v1.0.0",
        "title": "Extra",
        "jurisdiction": "AU",
        "evaluation_strategy": {
            "order": "ASC_PRIORITY",
            "conflict_resolution": "FIRST_MATCH",
            "default_effect": "BLOCK"
        },
        "rules": []
    });
    let response = router
        .clone()
        .oneshot(post("/api/policies/import", Some(&admin), doc.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Re-import conflicts.
    let response = router
        .clone()
        .oneshot(post("/api/policies/import", Some(&admin), doc))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "CONFLICT");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/policies/au-extra")
                .header(header::AUTHORIZATION, format!("Bearer {}", admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], json!(true));
}

#[tokio::test]
async fn invalid_policy_import_reports_field_paths() {
    let response = secured_router()
        .oneshot(post(
            "/api/policies/import",
            Some(&token("editor")),
            json!({"policy_id": "bad", "version": "1.0"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"].as_array().map(|a| !a.is_empty()).unwrap_or(false));
}

#[tokio::test]
async fn evaluate_round_trip_with_open_auth() {
    let response = open_router()
        .oneshot(post(
            "/api/evaluate",
            None,
            json!({"policy_id": "au-core", "request": {"message": "hello"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["decision"], "ALLOW");
    assert!(body["audit_id"].is_string());
}

#[tokio::test]
async fn audit_endpoints_expose_proof_and_listing() {
    let router = open_router();
    for _ in 0..2 {
        router
            .clone()
            .oneshot(post(
                "/api/evaluate",
                None,
                json!({"policy_id": "au-core", "request": {"org_id": "acme", "message": "hi"}}),
            ))
            .await
            .unwrap();
    }
    let response = router.clone().oneshot(get("/api/audit?org_id=acme", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    let response = router.clone().oneshot(get("/api/audit/proof/latest", None)).await.unwrap();
    let proof = body_json(response).await;
    assert_eq!(proof["last_index"], 1);
    assert_eq!(proof["merkle_root"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn unknown_policy_maps_to_not_found() {
    let response = open_router()
        .oneshot(post(
            "/api/evaluate/simulate",
            None,
            json!({"policy_id": "missing", "request": {}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn preview_ranking_returns_selected_candidate() {
    let response = open_router()
        .oneshot(post(
            "/api/routes/pools/general/preview-ranking",
            None,
            json!({"preferences": {"prefer_region": "AU"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pool_id"], "general");
    assert_eq!(body["candidates"][0]["selected"], json!(true));
}

#[tokio::test]
async fn routes_execute_uses_stub_connector() {
    let response = open_router()
        .oneshot(post(
            "/api/routes/execute",
            None,
            json!({"pool_id": "general", "request": {"message": "ping"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["routing"]["candidates"][0]["target_id"], "t1");
    assert_eq!(body["model_response"]["stub"], json!(true));
}

#[tokio::test]
async fn routing_error_when_pool_missing() {
    let response = open_router()
        .oneshot(post("/api/routes/execute", None, json!({"pool_id": "ghost"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "ROUTING_ERROR");
}
