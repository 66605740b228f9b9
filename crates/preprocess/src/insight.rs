//! Rule insight: a heuristic indicator that a specific rule is likely
//! relevant to the current payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Signals are deduplicated and capped so insights stay small on the wire.
const MAX_SIGNALS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleInsight {
    /// The rule the detector believes applies.
    pub rule_id: String,
    /// Heuristic confidence, clamped to [0, 1].
    pub confidence: f64,
    /// Deduplicated evidence snippets (at most ten).
    pub signals: Vec<String>,
    /// Fields the detector suggests setting on the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fields: Option<Map<String, Value>>,
    /// Fields the rule needs that the request does not carry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    pub notes: String,
    /// Set by the orchestrator when this insight's rule decided the request.
    #[serde(default)]
    pub matched: bool,
}

impl RuleInsight {
    pub fn new(rule_id: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            confidence: 0.5,
            signals: Vec::new(),
            suggested_fields: None,
            missing_fields: None,
            notes: String::new(),
            matched: false,
        }
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn signals<I: IntoIterator<Item = String>>(mut self, signals: I) -> Self {
        for s in signals {
            if self.signals.len() >= MAX_SIGNALS {
                break;
            }
            if !self.signals.contains(&s) {
                self.signals.push(s);
            }
        }
        self
    }

    pub fn suggest(mut self, field: &str, value: Value) -> Self {
        self.suggested_fields
            .get_or_insert_with(Map::new)
            .insert(field.to_string(), value);
        self
    }

    pub fn missing(mut self, field: &str) -> Self {
        self.missing_fields.get_or_insert_with(Vec::new).push(field.to_string());
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }
}
