//! Strict policy document validation: JSON schema plus semantic checks.

use crate::model::Policy;
use jsonschema::{Draft, JSONSchema};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

static SCHEMA_JSON: &str = include_str!("../schema/policy.schema.json");
static COMPILED: Lazy<JSONSchema> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(SCHEMA_JSON).expect("invalid schema json");
    JSONSchema::options().with_draft(Draft::Draft7).compile(&schema).expect("compile schema")
});

/// One validation failure with the field path that caused it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Validate a raw policy document against the embedded JSON schema.
///
/// Returns every structural violation; an empty list means the document is
/// schema-valid (semantic checks still apply, see [`validate_policy`]).
pub fn validate_policy_json(doc: &Value) -> Vec<ValidationIssue> {
    match COMPILED.validate(doc) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| ValidationIssue {
                path: e.instance_path.to_string(),
                message: e.to_string(),
            })
            .collect(),
    }
}

/// Semantic checks beyond the schema: rule-id uniqueness and non-empty
/// conditions (a rule never enters evaluation without one).
pub fn validate_policy_semantics(policy: &Policy) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (i, rule) in policy.rules.iter().enumerate() {
        if !seen.insert(rule.rule_id.as_str()) {
            issues.push(ValidationIssue {
                path: format!("/rules/{}/rule_id", i),
                message: format!("duplicate rule_id '{}'", rule.rule_id),
            });
        }
        if rule.condition.trim().is_empty() {
            issues.push(ValidationIssue {
                path: format!("/rules/{}/condition", i),
                message: "condition must be non-empty".into(),
            });
        }
        if matches!(rule.effect, crate::model::Effect::Route | crate::model::Effect::WarnRoute)
            && rule.route_to.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            issues.push(ValidationIssue {
                path: format!("/rules/{}/route_to", i),
                message: "routing effects require route_to".into(),
            });
        }
    }
    issues
}

/// Full strict validation of a raw document: schema first, then semantics.
///
/// Returns the parsed policy on success so create/update paths never hold an
/// unvalidated in-memory policy.
pub fn validate_policy(doc: &Value) -> Result<Policy, Vec<ValidationIssue>> {
    let issues = validate_policy_json(doc);
    if !issues.is_empty() {
        return Err(issues);
    }
    let policy: Policy = serde_json::from_value(doc.clone()).map_err(|e| {
        vec![ValidationIssue { path: String::new(), message: format!("malformed policy: {}", e) }]
    })?;
    let issues = validate_policy_semantics(&policy);
    if !issues.is_empty() {
        return Err(issues);
    }
    Ok(policy)
}
