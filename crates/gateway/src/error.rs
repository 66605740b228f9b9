//! Wire error envelope: `{error: {code, message, details?}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use warden_core::schema::ValidationIssue;

/// Gateway request failures, each mapping to one envelope code.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing or invalid bearer token: {0}")]
    Unauthenticated(String),
    #[error("capability not granted: {0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed")]
    Validation(Vec<ValidationIssue>),
    #[error("{0}")]
    Conflict(String),
    #[error("routing failed: {0}")]
    Routing(String),
    #[error("override rejected: {message}")]
    OverrideRejected { code: &'static str, message: String },
    #[error("request deadline exceeded during {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated(_) => "UNAUTHENTICATED",
            GatewayError::Forbidden(_) => "FORBIDDEN",
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::Validation(_) => "VALIDATION_ERROR",
            GatewayError::Conflict(_) => "CONFLICT",
            GatewayError::Routing(_) => "ROUTING_ERROR",
            GatewayError::OverrideRejected { code, .. } => code,
            GatewayError::Timeout(_) => "INTERNAL",
            GatewayError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::Routing(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::OverrideRejected { code, .. } => match *code {
                "JUSTIFICATION_REQUIRED" => StatusCode::BAD_REQUEST,
                _ => StatusCode::FORBIDDEN,
            },
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            GatewayError::Validation(issues) => Some(json!(issues)),
            GatewayError::Timeout(stage) => Some(json!({"timeout_stage": stage})),
            _ => None,
        }
    }

    /// The envelope body, independent of transport.
    pub fn envelope(&self) -> Value {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            error["details"] = details;
        }
        json!({ "error": error })
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

impl From<audit_log::AuditError> for GatewayError {
    fn from(e: audit_log::AuditError) -> Self {
        match e {
            audit_log::AuditError::NotFound(id) => {
                GatewayError::NotFound(format!("audit entry '{}' not found", id))
            }
            // A failed append breaks the tamper-evident invariant: the
            // decision is not delivered.
            other => GatewayError::Internal(format!("audit log failure: {}", other)),
        }
    }
}

impl From<routing::RoutingError> for GatewayError {
    fn from(e: routing::RoutingError) -> Self {
        GatewayError::Routing(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_code_and_message() {
        let e = GatewayError::NotFound("policy 'x' not found".into());
        let env = e.envelope();
        assert_eq!(env["error"]["code"], "NOT_FOUND");
        assert_eq!(env["error"]["message"], "policy 'x' not found");
        assert!(env["error"].get("details").is_none());
    }

    #[test]
    fn validation_error_includes_issue_details() {
        let e = GatewayError::Validation(vec![ValidationIssue {
            path: "/rules/0/condition".into(),
            message: "condition must be non-empty".into(),
        }]);
        let env = e.envelope();
        assert_eq!(env["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(env["error"]["details"][0]["path"], "/rules/0/condition");
    }

    #[test]
    fn override_rejection_uses_protocol_code() {
        let e = GatewayError::OverrideRejected {
            code: "ROLE_NOT_AUTHORIZED",
            message: "role 'analyst' may not override".into(),
        };
        assert_eq!(e.envelope()["error"]["code"], "ROLE_NOT_AUTHORIZED");
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
    }
}
