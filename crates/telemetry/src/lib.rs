//! Structured logging init and in-process decision metrics.
//!
//! Observability for the decision path:
//! - Every decision increments a low-cardinality counter
//!   `decision.count{policy_id, effect}`.
//! - An optional [`DecisionObserver`] can be installed to observe decisions
//!   in-process; implementations must be cheap and non-blocking.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("logging setup failed: {0}")]
    Setup(String),
}

/// Initialize structured logging (JSON) with env filter.
/// Set RUST_LOG, e.g., "info,gateway=debug".
pub fn init_json_logging() {
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).ok();
}

/// Observer invoked for each policy decision emitted by the gateway.
pub trait DecisionObserver: Send + Sync {
    /// Called with the policy id, decided effect and matched rule (if any).
    fn on_decision(&self, policy_id: &str, effect: &str, matched_rule: Option<&str>);
}

static OBSERVER: OnceLock<RwLock<Option<Arc<dyn DecisionObserver>>>> = OnceLock::new();

/// Install or clear the global decision observer.
pub fn set_observer(observer: Option<Box<dyn DecisionObserver>>) {
    let cell = OBSERVER.get_or_init(|| RwLock::new(None));
    let mut w = cell.write().expect("observer write lock poisoned");
    *w = observer.map(Arc::from);
}

/// In-process counters for decisions keyed by `{policy_id, effect}`.
///
/// Low-cardinality by construction; intended for tests and the management
/// metrics endpoint. Not persisted across process restarts.
#[derive(Default)]
pub struct DecisionMetrics {
    inner: Arc<Mutex<HashMap<String, u64>>>,
}

impl DecisionMetrics {
    /// Read the current count for a given {policy_id, effect} pair.
    pub fn decision_counter(&self, policy_id: &str, effect: &str) -> u64 {
        let key = format!("{}:{}", policy_id, effect);
        self.inner.lock().expect("metrics lock poisoned").get(&key).copied().unwrap_or(0)
    }

    /// Snapshot of all counters, for the metrics summary endpoint.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.inner.lock().expect("metrics lock poisoned").clone()
    }

    fn inc(&self, policy_id: &str, effect: &str) {
        let mut g = self.inner.lock().expect("metrics lock poisoned");
        *g.entry(format!("{}:{}", policy_id, effect)).or_insert(0) += 1;
    }
}

static METRICS: OnceLock<DecisionMetrics> = OnceLock::new();

/// Access the global decision metrics registry.
pub fn decision_metrics() -> &'static DecisionMetrics {
    METRICS.get_or_init(DecisionMetrics::default)
}

/// Record a decision: bump the counter and notify the observer.
pub fn record_decision(policy_id: &str, effect: &str, matched_rule: Option<&str>) {
    decision_metrics().inc(policy_id, effect);
    if let Some(lock) = OBSERVER.get() {
        if let Ok(r) = lock.read() {
            if let Some(obs) = r.as_ref() {
                obs.on_decision(policy_id, effect, matched_rule);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn counters_accumulate() {
        let m = decision_metrics();
        let before = m.decision_counter("p-test", "BLOCK");
        record_decision("p-test", "BLOCK", Some("R1"));
        record_decision("p-test", "BLOCK", None);
        assert_eq!(m.decision_counter("p-test", "BLOCK"), before + 2);
    }

    #[test]
    fn observer_sees_decisions() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);
        struct Capture;
        impl DecisionObserver for Capture {
            fn on_decision(&self, policy_id: &str, _: &str, _: Option<&str>) {
                // Other tests in this binary also record decisions.
                if policy_id == "p-obs" {
                    SEEN.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        set_observer(Some(Box::new(Capture)));
        record_decision("p-obs", "ALLOW", None);
        set_observer(None);
        record_decision("p-obs", "ALLOW", None);
        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
    }
}
