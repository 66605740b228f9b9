use preprocess::{enrich, take_insights, RULE_INSIGHTS_KEY};
use serde_json::json;

#[test]
fn health_payload_derives_class_and_insight() {
    let payload = json!({
        "messages": [{"role": "user", "content": "Patient requires MRI results sent overseas."}],
        "destination_region": "US"
    });
    let enriched = enrich(&payload);
    assert_eq!(enriched["data_class"], json!("health_record"));
    assert_eq!(enriched["personal_information"], json!(true));
    let insights = take_insights(&enriched);
    assert!(insights.iter().any(|i| i.rule_id == "HEALTH_NO_OFFSHORE"));
}

#[test]
fn cdr_terms_derive_cdr_data_class() {
    let payload = json!({
        "messages": [{"role": "user", "content": "Please analyse my open banking transaction history."}]
    });
    let enriched = enrich(&payload);
    assert_eq!(enriched["data_class"], json!("cdr_data"));
    let insights = take_insights(&enriched);
    assert!(insights.iter().any(|i| i.rule_id == "CDR_DATA_SOVEREIGNTY"));
}

#[test]
fn caller_set_data_class_wins() {
    let payload = json!({
        "data_class": "generic",
        "messages": [{"role": "user", "content": "patient diagnosis attached"}]
    });
    let enriched = enrich(&payload);
    assert_eq!(enriched["data_class"], json!("generic"));
}

#[test]
fn pii_fields_and_types_order() {
    let payload = json!({
        "message": "email a@b.co, card 4242 4242 4242 4242, SSN 123-45-6789"
    });
    let enriched = enrich(&payload);
    assert_eq!(enriched["contains_pii"], json!(true));
    assert_eq!(enriched["personal_information"], json!(true));
    let types: Vec<String> =
        serde_json::from_value(enriched["pii_types"].clone()).unwrap();
    let email = types.iter().position(|t| t == "email").unwrap();
    let card = types.iter().position(|t| t == "credit_card").unwrap();
    let ssn = types.iter().position(|t| t == "ssn").unwrap();
    assert!(email < card && card < ssn);
}

#[test]
fn caller_set_personal_information_is_not_toggled() {
    let payload = json!({
        "personal_information": false,
        "message": "contact a@b.co"
    });
    let enriched = enrich(&payload);
    assert_eq!(enriched["personal_information"], json!(false));
}

#[test]
fn profanity_emits_both_insights() {
    let payload = json!({"message": "this is bullshit"});
    let insights = take_insights(&enrich(&payload));
    assert!(insights.iter().any(|i| i.rule_id == "PROFANITY_BLOCK_STRICT"));
    assert!(insights.iter().any(|i| i.rule_id == "PROFANITY_WARN_INTERNAL"));
}

#[test]
fn app8_lists_missing_destination_region() {
    let payload = json!({"message": "send a@b.co the invoice"});
    let insights = take_insights(&enrich(&payload));
    let app8 = insights.iter().find(|i| i.rule_id == "PRIV_APP8_CROSS_BORDER").unwrap();
    assert_eq!(app8.missing_fields.as_deref(), Some(&["destination_region".to_string()][..]));
}

#[test]
fn summarization_sets_purpose() {
    let payload = json!({"message": "Summarize this article for me"});
    let enriched = enrich(&payload);
    assert_eq!(enriched["purpose"], json!("summarization"));
    let insights = take_insights(&enriched);
    assert!(insights.iter().any(|i| i.rule_id == "COPYRIGHT_SUMMARIZATION_WARN_ROUTE"));
}

#[test]
fn sandbox_environment_flagged() {
    let payload = json!({"environment": "sandbox", "message": "hello"});
    let insights = take_insights(&enrich(&payload));
    assert!(insights.iter().any(|i| i.rule_id == "SANDBOX_NO_PERSIST"));
}

#[test]
fn enrichment_is_idempotent() {
    let payload = json!({
        "messages": [{"role": "user", "content": "Patient TFN 123 456 789, email a@b.co, summarize please"}],
        "environment": "testing"
    });
    let once = enrich(&payload);
    let twice = enrich(&once);
    assert_eq!(once, twice);
}

#[test]
fn enrichment_is_deterministic() {
    let payload = json!({"message": "patient records with a@b.co and 4242 4242 4242 4242"});
    let a = serde_json::to_string(&enrich(&payload)).unwrap();
    let b = serde_json::to_string(&enrich(&payload)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn insights_live_under_reserved_key() {
    let enriched = enrich(&json!({"message": "hello"}));
    assert!(enriched.get(RULE_INSIGHTS_KEY).is_some());
}
