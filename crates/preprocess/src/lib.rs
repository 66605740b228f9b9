//! Payload enrichment: content inspection and rule-relevance detectors.
//!
//! [`enrich`] returns a new context map: the input payload, the inspection
//! fields derived from its message text, the fields derived by the detector
//! pipeline, and the collected insights under [`RULE_INSIGHTS_KEY`].
//!
//! Enrichment is deterministic (no randomness, no clock, no I/O) and
//! idempotent over the keys it sets: enriching an already-enriched payload
//! recomputes the same values and never toggles a field it set before.

#![deny(unsafe_code)]

mod detectors;
mod insight;
mod inspect;

pub use insight::RuleInsight;
pub use inspect::{extract_message_text, inspect, luhn_valid, Inspection};

use serde_json::{json, Map, Value};

/// Reserved context key carrying the detector insights.
pub const RULE_INSIGHTS_KEY: &str = "__rule_insights";

/// Enrich a request payload. Non-object payloads are returned unchanged.
pub fn enrich(payload: &Value) -> Value {
    let Some(obj) = payload.as_object() else {
        return payload.clone();
    };
    let mut map = obj.clone();
    let text = extract_message_text(payload);
    let inspection = inspect(&text);

    map.insert(
        "detected_entities".into(),
        json!({
            "emails": inspection.emails,
            "phones": inspection.phones,
            "id_numbers": inspection.id_numbers,
            "credit_cards": inspection.credit_cards,
            "addresses": inspection.addresses,
            "abns": inspection.abns,
            "tfns": inspection.tfns,
            "ssns": inspection.ssns,
        }),
    );
    map.insert("profanities".into(), json!(inspection.profanities));
    map.insert("risk_flags".into(), json!(inspection.risk_flags));
    map.insert("possible_copyrighted".into(), json!(inspection.possible_copyrighted));

    let pii_types = inspection.pii_types();
    map.insert("pii_types".into(), json!(pii_types));
    map.insert("contains_pii".into(), json!(!pii_types.is_empty()));
    if !pii_types.is_empty() && !map.contains_key("personal_information") {
        map.insert("personal_information".into(), json!(true));
    }

    let insights = detectors::run_detectors(&mut map, &text);
    map.insert(
        RULE_INSIGHTS_KEY.into(),
        serde_json::to_value(insights).expect("insights serialize"),
    );

    Value::Object(map)
}

/// Pull the insights back out of an enriched context.
pub fn take_insights(ctx: &Value) -> Vec<RuleInsight> {
    ctx.get(RULE_INSIGHTS_KEY)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
