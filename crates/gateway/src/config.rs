//! Environment-driven configuration and the optional YAML seed file.

use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use warden_core::routing::{ModelPool, RouteTarget};

/// Gateway configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// HS256 secret for bearer tokens. Empty disables auth (dev mode).
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    /// Salt mixed into every audit payload hash.
    pub hash_salt: String,
    /// Pool used for executable decisions without an explicit `route_to`.
    pub default_model_pool: Option<String>,
    /// When true and no live connector is configured, return a
    /// deterministic stub response instead of erroring.
    pub stub_responses: bool,
    pub audit_log_path: Option<PathBuf>,
    pub seed_file: Option<PathBuf>,
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            jwt_secret: String::new(),
            jwt_issuer: None,
            jwt_audience: None,
            hash_salt: String::new(),
            default_model_pool: None,
            stub_responses: true,
            audit_log_path: None,
            seed_file: None,
            request_timeout_ms: 10_000,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            bind_addr: env_opt("WARDEN_BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret: env_opt("JWT_SECRET").unwrap_or_default(),
            jwt_issuer: env_opt("JWT_ISSUER"),
            jwt_audience: env_opt("JWT_AUDIENCE"),
            hash_salt: env_opt("HASH_SALT").unwrap_or_default(),
            default_model_pool: env_opt("DEFAULT_MODEL_POOL"),
            stub_responses: env_opt("MODEL_GARDEN_STUB_RESPONSES")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            audit_log_path: env_opt("WARDEN_AUDIT_LOG").map(PathBuf::from),
            seed_file: env_opt("WARDEN_SEED_FILE").map(PathBuf::from),
            request_timeout_ms: env_opt("WARDEN_REQUEST_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
        }
    }
}

/// Seed content applied at startup: policies, pools and targets.
///
/// Policies are raw JSON values so they pass through the same strict
/// validation as API imports.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub policies: Vec<Value>,
    #[serde(default)]
    pub pools: Vec<ModelPool>,
    #[serde(default)]
    pub targets: Vec<RouteTarget>,
}

impl SeedFile {
    /// Parse a YAML seed document.
    pub fn from_yaml(text: &str) -> Result<Self, String> {
        serde_yaml::from_str(text).map_err(|e| format!("malformed seed file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_file_parses_policies_and_pools() {
        let yaml = r#"
policies:
  - policy_id: au-default
    version: v1.0.0
    title: AU defaults
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
"#;
        let seed = SeedFile::from_yaml(yaml).unwrap();
        assert_eq!(seed.policies.len(), 1);
        assert_eq!(seed.pools.len(), 1);
        assert_eq!(seed.targets.len(), 1);
        assert!(warden_core::schema::validate_policy(&seed.policies[0]).is_ok());
    }

    #[test]
    fn malformed_seed_errors() {
        assert!(SeedFile::from_yaml("policies: {").is_err());
    }
}
