use policy::evaluate_policy;
use serde_json::json;
use warden_core::model::{Effect, Policy};

fn policy_with_rules(rules: serde_json::Value) -> Policy {
    serde_json::from_value(json!({
        "policy_id": "au-test",
        "version": "v1.0.0",
        "title": "Priority tests",
        "jurisdiction": "AU",
        "evaluation_strategy": {
            "order": "ASC_PRIORITY",
            "conflict_resolution": "FIRST_MATCH",
            "default_effect": "ALLOW"
        },
        "rules": rules
    }))
    .unwrap()
}

fn rule(id: &str, priority: u32, condition: &str, effect: &str) -> serde_json::Value {
    json!({
        "rule_id": id,
        "title": id,
        "category": "PRIVACY",
        "jurisdiction": "AU",
        "condition": condition,
        "effect": effect,
        "priority": priority,
        "severity": "MEDIUM"
    })
}

#[test]
fn ascending_priority_first_match() {
    let p = policy_with_rules(json!([
        rule("later", 20, "flag == true", "BLOCK"),
        rule("earlier", 10, "flag == true", "ROUTE"),
    ]));
    let out = evaluate_policy(&p, &json!({"flag": true}));
    assert_eq!(out.matched_rule.as_deref(), Some("earlier"));
    assert_eq!(out.decision, Effect::Route);
}

#[test]
fn matched_rule_has_lowest_priority_among_matching() {
    let p = policy_with_rules(json!([
        rule("p30", 30, "true", "BLOCK"),
        rule("p10_nomatch", 10, "false", "BLOCK"),
        rule("p20", 20, "true", "REQUIRE_OVERRIDE"),
    ]));
    let out = evaluate_policy(&p, &json!({}));
    assert_eq!(out.matched_rule.as_deref(), Some("p20"));
    assert_eq!(out.decision, Effect::RequireOverride);
}

#[test]
fn equal_priority_keeps_declaration_order() {
    let p = policy_with_rules(json!([
        rule("first", 7, "true", "BLOCK"),
        rule("second", 7, "true", "ROUTE"),
    ]));
    let out = evaluate_policy(&p, &json!({}));
    assert_eq!(out.matched_rule.as_deref(), Some("first"));
}

#[test]
fn disabled_rules_never_match() {
    let mut disabled = rule("off", 1, "true", "BLOCK");
    disabled["enabled"] = json!(false);
    let p = policy_with_rules(json!([disabled, rule("on", 2, "true", "ROUTE")]));
    let out = evaluate_policy(&p, &json!({}));
    assert_eq!(out.matched_rule.as_deref(), Some("on"));
    assert_eq!(out.decision, Effect::Route);
}

#[test]
fn default_effect_when_nothing_matches() {
    let p = policy_with_rules(json!([rule("r", 10, "has('absent')", "BLOCK")]));
    let out = evaluate_policy(&p, &json!({}));
    assert_eq!(out.decision, Effect::Allow);
    assert!(out.matched_rule.is_none());
}

#[test]
fn evaluation_is_deterministic() {
    let p = policy_with_rules(json!([
        rule("a", 10, "data_class in ['health_record']", "BLOCK"),
        rule("b", 20, "contains(message, 'patient')", "ROUTE"),
    ]));
    let ctx = json!({"data_class": "health_record", "message": "patient data"});
    let d1 = serde_json::to_string(&evaluate_policy(&p, &ctx)).unwrap();
    let d2 = serde_json::to_string(&evaluate_policy(&p, &ctx)).unwrap();
    assert_eq!(d1, d2);
}
