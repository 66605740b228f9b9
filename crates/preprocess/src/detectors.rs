//! Rule-relevance detectors.
//!
//! Each detector reads the enriched payload (including fields derived by the
//! detectors before it), may add derived fields when they are unset, and may
//! emit insights naming the compliance rule it believes applies.

use crate::insight::RuleInsight;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::inspect::term_regex;

static HEALTH_RE: Lazy<Regex> = Lazy::new(|| {
    term_regex(&[
        "patient",
        "diagnosis",
        "pathology",
        "prescription",
        "medical record",
        "medicare",
        "clinical",
        "radiology",
        "mri",
        "treatment plan",
        "symptoms",
    ])
});

static CDR_RE: Lazy<Regex> = Lazy::new(|| {
    term_regex(&[
        "open banking",
        "cdr",
        "consumer data right",
        "account transactions",
        "transaction history",
        "bank statement",
    ])
});

static DEMOGRAPHIC_RE: Lazy<Regex> = Lazy::new(|| {
    term_regex(&[
        "gender",
        "ethnicity",
        "race",
        "religion",
        "sexual orientation",
        "disability",
        "marital status",
        "protected attribute",
        "demographic",
    ])
});

static SUMMARIZATION_RE: Lazy<Regex> =
    Lazy::new(|| term_regex(&["summarize", "summarise", "summary", "tl;dr"]));

fn field_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

fn field_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn set_if_unset(map: &mut Map<String, Value>, key: &str, value: Value) {
    if !map.contains_key(key) {
        map.insert(key.to_string(), value);
    }
}

fn matched_terms(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let t = m.as_str().to_lowercase();
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

fn health(map: &mut Map<String, Value>, text: &str) -> Vec<RuleInsight> {
    let terms = matched_terms(&HEALTH_RE, text);
    if terms.is_empty() {
        return Vec::new();
    }
    set_if_unset(map, "data_class", json!("health_record"));
    set_if_unset(map, "personal_information", json!(true));
    let confidence = 0.6 + 0.1 * terms.len() as f64;
    vec![RuleInsight::new("HEALTH_NO_OFFSHORE")
        .confidence(confidence)
        .signals(terms.iter().map(|t| format!("health_term:{}", t)))
        .suggest("data_class", json!("health_record"))
        .notes("Health-related content; offshore transfer restrictions likely apply")]
}

fn credit_card(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let types = field_list(map, "pii_types");
    if !types.iter().any(|t| t == "credit_card") {
        return Vec::new();
    }
    vec![RuleInsight::new("CREDIT_CARD_OFFSHORE_BLOCK")
        .confidence(0.95)
        .signals(["luhn_valid_card"].iter().map(|s| s.to_string()))
        .notes("Card number passed Luhn validation; offshore processing is restricted")]
}

fn sensitive_ids(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let types = field_list(map, "pii_types");
    let hits: Vec<String> = types
        .iter()
        .filter(|t| matches!(t.as_str(), "abn" | "tfn" | "ssn" | "id_number"))
        .map(|t| format!("id:{}", t))
        .collect();
    if hits.is_empty() {
        return Vec::new();
    }
    vec![RuleInsight::new("SENSITIVE_IDS_STRICT")
        .confidence(0.8)
        .signals(hits)
        .notes("Government or tax identifiers present")]
}

fn risky_content(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let flags = field_list(map, "risk_flags");
    let hits: Vec<String> = flags
        .iter()
        .filter(|f| matches!(f.as_str(), "hate" | "violence" | "adult" | "self_harm"))
        .map(|f| format!("risk:{}", f))
        .collect();
    if hits.is_empty() {
        return Vec::new();
    }
    vec![RuleInsight::new("RISK_CONTENT_GUARD")
        .confidence(0.85)
        .signals(hits)
        .notes("High-risk content categories flagged")]
}

fn profanity(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let words = field_list(map, "profanities");
    if words.is_empty() {
        return Vec::new();
    }
    let signals: Vec<String> = words.iter().map(|w| format!("profanity:{}", w)).collect();
    vec![
        RuleInsight::new("PROFANITY_BLOCK_STRICT")
            .confidence(0.9)
            .signals(signals.clone())
            .notes("Profanity detected; strict tenants block outright"),
        RuleInsight::new("PROFANITY_WARN_INTERNAL")
            .confidence(0.7)
            .signals(signals)
            .notes("Profanity detected; internal traffic is warn-routed"),
    ]
}

fn copyright(map: &mut Map<String, Value>, text: &str) -> Vec<RuleInsight> {
    let summarization = SUMMARIZATION_RE.is_match(text);
    let flagged = map.get("possible_copyrighted").and_then(Value::as_bool).unwrap_or(false);
    if !summarization && !flagged {
        return Vec::new();
    }
    if summarization {
        set_if_unset(map, "purpose", json!("summarization"));
    }
    let mut signals = Vec::new();
    if summarization {
        signals.push("summarization_request".to_string());
    }
    if flagged {
        signals.push("possible_copyrighted_text".to_string());
    }
    vec![RuleInsight::new("COPYRIGHT_SUMMARIZATION_WARN_ROUTE")
        .confidence(if flagged { 0.8 } else { 0.6 })
        .signals(signals)
        .suggest("purpose", json!("summarization"))
        .notes("Copyrighted material may be summarized; route with caution")]
}

fn pii_redact(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    if !map.get("contains_pii").and_then(Value::as_bool).unwrap_or(false) {
        return Vec::new();
    }
    let signals = field_list(map, "pii_types").into_iter().map(|t| format!("pii:{}", t));
    vec![RuleInsight::new("PII_REDACT_ROUTE")
        .confidence(0.85)
        .signals(signals)
        .notes("PII present; redaction-capable route recommended")]
}

fn app8_cross_border(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let personal = map
        .get("personal_information")
        .map(warden_core::context::truthy)
        .unwrap_or(false);
    if !personal {
        return Vec::new();
    }
    let mut insight = RuleInsight::new("PRIV_APP8_CROSS_BORDER")
        .confidence(0.7)
        .signals(["personal_information".to_string()])
        .notes("APP 8 cross-border disclosure obligations apply");
    if field_str(map, "destination_region").is_none() {
        insight = insight.missing("destination_region");
    }
    vec![insight]
}

fn cdr_data(map: &mut Map<String, Value>, text: &str) -> Vec<RuleInsight> {
    let terms = matched_terms(&CDR_RE, text);
    if terms.is_empty() {
        return Vec::new();
    }
    set_if_unset(map, "data_class", json!("cdr_data"));
    vec![RuleInsight::new("CDR_DATA_SOVEREIGNTY")
        .confidence(0.6 + 0.1 * terms.len() as f64)
        .signals(terms.iter().map(|t| format!("cdr_term:{}", t)))
        .suggest("data_class", json!("cdr_data"))
        .notes("Consumer Data Right material; sovereignty constraints apply")]
}

fn ai_risk(map: &mut Map<String, Value>, text: &str) -> Vec<RuleInsight> {
    let terms = matched_terms(&DEMOGRAPHIC_RE, text);
    if terms.is_empty() {
        return Vec::new();
    }
    set_if_unset(map, "data_class", json!("demographic_data"));
    set_if_unset(map, "ai_risk_level", json!("high"));
    vec![RuleInsight::new("AI_RISK_BIAS_AUDIT")
        .confidence(0.65)
        .signals(terms.iter().map(|t| format!("demographic_term:{}", t)))
        .suggest("ai_risk_level", json!("high"))
        .notes("Protected attributes referenced; bias audit obligations likely")]
}

fn sandbox(map: &mut Map<String, Value>, _text: &str) -> Vec<RuleInsight> {
    let env = field_str(map, "environment").unwrap_or("");
    if !matches!(env, "sandbox" | "testing" | "development") {
        return Vec::new();
    }
    vec![RuleInsight::new("SANDBOX_NO_PERSIST")
        .confidence(0.9)
        .signals([format!("environment:{}", env)])
        .notes("Non-production environment; persistence should be disabled")]
}

type Detector = fn(&mut Map<String, Value>, &str) -> Vec<RuleInsight>;

/// Pipeline order matters: later detectors see fields derived earlier.
const PIPELINE: &[Detector] = &[
    health,
    credit_card,
    sensitive_ids,
    risky_content,
    profanity,
    copyright,
    pii_redact,
    app8_cross_border,
    cdr_data,
    ai_risk,
    sandbox,
];

/// Run every detector left-to-right and collect the emitted insights.
pub fn run_detectors(map: &mut Map<String, Value>, text: &str) -> Vec<RuleInsight> {
    let mut insights = Vec::new();
    for detector in PIPELINE {
        insights.extend(detector(map, text));
    }
    insights
}
