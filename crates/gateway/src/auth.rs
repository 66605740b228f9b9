//! Bearer-token authentication and role→capability mapping.
//!
//! Tokens are HS256 JWTs carrying a `role` claim, validated against
//! `JWT_SECRET` / `JWT_ISSUER` / `JWT_AUDIENCE`. Issuance is someone
//! else's job; the gateway only verifies. An empty secret disables auth
//! for local development, granting an anonymous admin context.

use crate::error::GatewayError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Actions a caller may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    EditRules,
    Simulate,
    PublishRules,
    ManageOverrides,
    ManageRoutes,
    ManageUsers,
    ManageSettings,
}

const ALL_CAPABILITIES: &[Capability] = &[
    Capability::Read,
    Capability::EditRules,
    Capability::Simulate,
    Capability::PublishRules,
    Capability::ManageOverrides,
    Capability::ManageRoutes,
    Capability::ManageUsers,
    Capability::ManageSettings,
];

/// Static role table; unknown roles are read-only.
pub fn role_capabilities(role: &str) -> &'static [Capability] {
    match role {
        "admin" => ALL_CAPABILITIES,
        "compliance" => &[Capability::Read, Capability::Simulate, Capability::ManageOverrides],
        "editor" => &[
            Capability::Read,
            Capability::EditRules,
            Capability::Simulate,
            Capability::PublishRules,
        ],
        "analyst" | "service" => &[Capability::Read, Capability::Simulate],
        _ => &[Capability::Read],
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    role: Option<String>,
}

/// Authenticated caller identity for one request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub actor_id: Option<String>,
    pub role: String,
    capabilities: HashSet<Capability>,
}

impl AuthContext {
    /// Context for a verified role.
    pub fn for_role(role: &str, actor_id: Option<String>) -> Self {
        Self {
            actor_id,
            role: role.to_string(),
            capabilities: role_capabilities(role).iter().copied().collect(),
        }
    }

    /// Fail with FORBIDDEN unless the capability was granted.
    pub fn require(&self, capability: Capability) -> Result<(), GatewayError> {
        if self.capabilities.contains(&capability) {
            Ok(())
        } else {
            Err(GatewayError::Forbidden(format!(
                "role '{}' lacks {:?}",
                self.role, capability
            )))
        }
    }
}

/// Verify a bearer token against the configured secret.
pub fn verify_token(
    token: &str,
    secret: &str,
    issuer: Option<&str>,
    audience: Option<&str>,
) -> Result<AuthContext, GatewayError> {
    let mut validation = Validation::new(Algorithm::HS256);
    match issuer {
        Some(iss) => validation.set_issuer(&[iss]),
        None => {}
    }
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| GatewayError::Unauthenticated(e.to_string()))?;
    let role = data.claims.role.unwrap_or_else(|| "analyst".to_string());
    Ok(AuthContext::for_role(&role, data.claims.sub))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();
        if config.jwt_secret.is_empty() {
            return Ok(AuthContext::for_role("admin", None));
        }
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| GatewayError::Unauthenticated("missing Authorization header".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| GatewayError::Unauthenticated("expected Bearer scheme".into()))?;
        verify_token(
            token,
            &config.jwt_secret,
            config.jwt_issuer.as_deref(),
            config.jwt_audience.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(secret: &str, claims: serde_json::Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_maps_role_capabilities() {
        let t = token("s3cret", json!({"sub": "u1", "role": "compliance", "exp": 4102444800u64}));
        let ctx = verify_token(&t, "s3cret", None, None).unwrap();
        assert_eq!(ctx.role, "compliance");
        assert_eq!(ctx.actor_id.as_deref(), Some("u1"));
        assert!(ctx.require(Capability::ManageOverrides).is_ok());
        assert!(ctx.require(Capability::PublishRules).is_err());
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let t = token("other", json!({"role": "admin", "exp": 4102444800u64}));
        assert!(matches!(
            verify_token(&t, "s3cret", None, None),
            Err(GatewayError::Unauthenticated(_))
        ));
    }

    #[test]
    fn issuer_mismatch_rejected() {
        let t = token(
            "s3cret",
            json!({"role": "admin", "iss": "other", "exp": 4102444800u64}),
        );
        assert!(verify_token(&t, "s3cret", Some("warden"), None).is_err());
    }

    #[test]
    fn unknown_role_is_read_only() {
        let ctx = AuthContext::for_role("mystery", None);
        assert!(ctx.require(Capability::Read).is_ok());
        assert!(ctx.require(Capability::Simulate).is_err());
    }

    #[test]
    fn admin_has_everything() {
        let ctx = AuthContext::for_role("admin", None);
        for cap in ALL_CAPABILITIES {
            assert!(ctx.require(*cap).is_ok());
        }
    }
}
