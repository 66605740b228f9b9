//! Policy decision and model-routing gateway.
//!
//! Ties the core subsystems together: the preprocessor enriches each
//! inbound payload, the policy engine produces a decision with a full
//! trace, the routing scorer ranks the selected pool for executable
//! decisions, and every decision is committed to the hash-chained audit log
//! before any model invocation. Management operations publish new
//! policy/routing snapshots atomically; in-flight requests keep the
//! snapshot they started with.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod connector;
pub mod error;
pub mod orchestrator;
pub mod overrides;
pub mod routes;
pub mod store;

pub use config::Config;
pub use error::GatewayError;
pub use routes::build_router;

use audit_log::AuditLog;
use config::SeedFile;
use connector::{ModelConnector, StubConnector};
use std::sync::Arc;
use store::{PolicyStore, RouteStore};
use tracing::info;
use warden_core::schema::validate_policy;

struct AppStateInner {
    config: Config,
    policies: PolicyStore,
    routes: RouteStore,
    audit: AuditLog,
    connector: Box<dyn ModelConnector>,
}

/// Shared gateway state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    /// Build state from configuration: opens (or creates) the audit log and
    /// applies the seed file when configured.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let audit = match &config.audit_log_path {
            Some(path) => AuditLog::open(config.hash_salt.clone(), path)?,
            None => AuditLog::in_memory(config.hash_salt.clone()),
        };
        let state = Self {
            inner: Arc::new(AppStateInner {
                policies: PolicyStore::default(),
                routes: RouteStore::default(),
                audit,
                connector: Box::new(StubConnector),
                config,
            }),
        };
        if let Some(path) = state.config().seed_file.clone() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| GatewayError::Internal(format!("seed file {:?}: {}", path, e)))?;
            let seed = SeedFile::from_yaml(&text).map_err(GatewayError::Internal)?;
            state.apply_seed(seed)?;
        }
        Ok(state)
    }

    /// In-memory state for tests and local development.
    pub fn in_memory(config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                audit: AuditLog::in_memory(config.hash_salt.clone()),
                policies: PolicyStore::default(),
                routes: RouteStore::default(),
                connector: Box::new(StubConnector),
                config,
            }),
        }
    }

    /// Validate and install seed policies, pools and targets.
    pub fn apply_seed(&self, seed: SeedFile) -> Result<(), GatewayError> {
        for doc in &seed.policies {
            let policy = validate_policy(doc).map_err(GatewayError::Validation)?;
            info!(policy = %policy.policy_id, "seeded policy");
            self.policies().upsert(policy);
        }
        if !seed.pools.is_empty() || !seed.targets.is_empty() {
            self.routes().extend(seed.pools, seed.targets);
        }
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn policies(&self) -> &PolicyStore {
        &self.inner.policies
    }

    pub fn routes(&self) -> &RouteStore {
        &self.inner.routes
    }

    pub fn audit(&self) -> &AuditLog {
        &self.inner.audit
    }

    pub fn connector(&self) -> &dyn ModelConnector {
        self.inner.connector.as_ref()
    }
}
