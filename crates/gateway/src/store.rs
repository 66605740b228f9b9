//! Copy-on-write configuration stores.
//!
//! Policies and routing config are read-mostly: readers take the current
//! snapshot pointer without blocking writers, and management writes build a
//! new snapshot and swap it under the write lock. A rule-list rewrite is
//! never partially observable.

use crate::error::GatewayError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use warden_core::model::Policy;
use warden_core::routing::{ModelPool, RouteTarget};

type PolicyMap = HashMap<String, Arc<Policy>>;

/// Snapshot store for policies, keyed by `policy_id`.
#[derive(Default)]
pub struct PolicyStore {
    inner: RwLock<Arc<PolicyMap>>,
}

impl PolicyStore {
    /// Current consistent snapshot.
    pub fn snapshot(&self) -> Arc<PolicyMap> {
        self.inner.read().expect("policy store poisoned").clone()
    }

    pub fn get(&self, policy_id: &str) -> Result<Arc<Policy>, GatewayError> {
        self.snapshot()
            .get(policy_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("policy '{}' not found", policy_id)))
    }

    /// All policies, sorted by id for stable listings.
    pub fn list(&self) -> Vec<Arc<Policy>> {
        let snapshot = self.snapshot();
        let mut out: Vec<Arc<Policy>> = snapshot.values().cloned().collect();
        out.sort_by(|a, b| a.policy_id.cmp(&b.policy_id));
        out
    }

    /// Insert a new policy; CONFLICT when the id already exists.
    pub fn insert(&self, policy: Policy) -> Result<(), GatewayError> {
        let mut guard = self.inner.write().expect("policy store poisoned");
        if guard.contains_key(&policy.policy_id) {
            return Err(GatewayError::Conflict(format!(
                "policy '{}' already exists",
                policy.policy_id
            )));
        }
        let mut next: PolicyMap = (**guard).clone();
        next.insert(policy.policy_id.clone(), Arc::new(policy));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Replace an existing policy; NOT_FOUND when absent.
    pub fn replace(&self, policy: Policy) -> Result<(), GatewayError> {
        let mut guard = self.inner.write().expect("policy store poisoned");
        if !guard.contains_key(&policy.policy_id) {
            return Err(GatewayError::NotFound(format!(
                "policy '{}' not found",
                policy.policy_id
            )));
        }
        let mut next: PolicyMap = (**guard).clone();
        next.insert(policy.policy_id.clone(), Arc::new(policy));
        *guard = Arc::new(next);
        Ok(())
    }

    /// Insert-or-replace, used by seed loading.
    pub fn upsert(&self, policy: Policy) {
        let mut guard = self.inner.write().expect("policy store poisoned");
        let mut next: PolicyMap = (**guard).clone();
        next.insert(policy.policy_id.clone(), Arc::new(policy));
        *guard = Arc::new(next);
    }

    pub fn remove(&self, policy_id: &str) -> Result<(), GatewayError> {
        let mut guard = self.inner.write().expect("policy store poisoned");
        if !guard.contains_key(policy_id) {
            return Err(GatewayError::NotFound(format!("policy '{}' not found", policy_id)));
        }
        let mut next: PolicyMap = (**guard).clone();
        next.remove(policy_id);
        *guard = Arc::new(next);
        Ok(())
    }
}

/// Immutable routing configuration snapshot.
#[derive(Default, Clone)]
pub struct RouteConfig {
    pub pools: Vec<ModelPool>,
    pub targets: Vec<RouteTarget>,
}

impl RouteConfig {
    pub fn pool(&self, pool_id: &str) -> Option<&ModelPool> {
        self.pools.iter().find(|p| p.pool_id == pool_id)
    }

    pub fn targets_for(&self, pool_id: &str) -> Vec<RouteTarget> {
        self.targets.iter().filter(|t| t.pool_id == pool_id).cloned().collect()
    }
}

/// Snapshot store for pools and targets.
#[derive(Default)]
pub struct RouteStore {
    inner: RwLock<Arc<RouteConfig>>,
}

impl RouteStore {
    pub fn snapshot(&self) -> Arc<RouteConfig> {
        self.inner.read().expect("route store poisoned").clone()
    }

    pub fn pool(&self, pool_id: &str) -> Result<ModelPool, GatewayError> {
        self.snapshot()
            .pool(pool_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("pool '{}' not found", pool_id)))
    }

    /// Swap in a full routing configuration.
    pub fn publish(&self, config: RouteConfig) {
        let mut guard = self.inner.write().expect("route store poisoned");
        *guard = Arc::new(config);
    }

    /// Add pools and targets to the current snapshot (seed loading).
    pub fn extend(&self, pools: Vec<ModelPool>, targets: Vec<RouteTarget>) {
        let mut guard = self.inner.write().expect("route store poisoned");
        let mut next: RouteConfig = (**guard).clone();
        next.pools.extend(pools);
        next.targets.extend(targets);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(id: &str) -> Policy {
        serde_json::from_value(json!({
            "policy_id": id,
            "version": "v1.0.0",
            "title": id,
            "jurisdiction": "AU",
            "evaluation_strategy": {
                "order": "ASC_PRIORITY",
                "conflict_resolution": "FIRST_MATCH",
                "default_effect": "ALLOW"
            },
            "rules": []
        }))
        .unwrap()
    }

    #[test]
    fn insert_conflicts_on_duplicate() {
        let store = PolicyStore::default();
        store.insert(policy("p1")).unwrap();
        assert!(matches!(store.insert(policy("p1")), Err(GatewayError::Conflict(_))));
    }

    #[test]
    fn replace_requires_existing() {
        let store = PolicyStore::default();
        assert!(matches!(store.replace(policy("p1")), Err(GatewayError::NotFound(_))));
        store.insert(policy("p1")).unwrap();
        store.replace(policy("p1")).unwrap();
    }

    #[test]
    fn snapshots_are_immutable_views() {
        let store = PolicyStore::default();
        store.insert(policy("p1")).unwrap();
        let before = store.snapshot();
        store.insert(policy("p2")).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn listing_is_sorted_by_id() {
        let store = PolicyStore::default();
        store.insert(policy("zeta")).unwrap();
        store.insert(policy("alpha")).unwrap();
        let ids: Vec<String> = store.list().iter().map(|p| p.policy_id.clone()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
