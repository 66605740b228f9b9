//! Per-target scoring terms.

use warden_core::model::ResidencyRequirement;
use warden_core::routing::{ModelProfile, ModelStrength, RouteTarget, RoutingPreference};

const LOCAL_DEPLOYMENTS: &[&str] = &["local", "onsite", "onprem"];

/// Score a single target against the caller preferences.
///
/// Returns the total score and the human-readable reasons for each applied
/// term.
pub fn score_target(target: &RouteTarget, prefs: &RoutingPreference) -> (f64, Vec<String>) {
    let mut score = target.weight;
    let mut reasons = vec![format!("base weight {}", target.weight)];

    if let Some(profile) = &target.profile {
        score_profile(profile, prefs, &mut score, &mut reasons);
    } else if prefs.requires_on_prem {
        score -= 6000.0;
        reasons.push("on-prem required but target has no profile (-6000)".into());
    }

    if prefs.prefer_region.as_deref() == Some(target.region.as_str()) {
        score += 50.0;
        reasons.push(format!("preferred region {} (+50)", target.region));
    }
    if prefs.provider.as_deref() == Some(target.provider.as_str()) {
        score += 25.0;
        reasons.push(format!("preferred provider {} (+25)", target.provider));
    }
    if prefs.minimize_latency {
        if let Some(p95) = target
            .profile
            .as_ref()
            .and_then(|p| p.performance.as_ref())
            .and_then(|p| p.p95_latency_ms)
        {
            let boost = 500.0 / p95.max(1.0);
            score += boost;
            reasons.push(format!("minimize latency p95={}ms (+{:.1})", p95, boost));
        }
    }

    (score, reasons)
}

fn score_profile(
    profile: &ModelProfile,
    prefs: &RoutingPreference,
    score: &mut f64,
    reasons: &mut Vec<String>,
) {
    let perf = profile.performance.as_ref();
    if let Some(avg) = perf.and_then(|p| p.avg_latency_ms) {
        let boost = 1000.0 / avg.max(1.0);
        *score += boost;
        reasons.push(format!("avg latency {}ms (+{:.1})", avg, boost));
    }
    if let Some(availability) = perf.and_then(|p| p.availability) {
        *score += availability * 10.0;
        reasons.push(format!("availability {:.2} (+{:.1})", availability, availability * 10.0));
    }

    if !prefs.compliance_tags.is_empty() {
        let hits = compliance_tag_hits(profile, &prefs.compliance_tags);
        if hits > 0 {
            *score += 25.0 * hits as f64;
            reasons.push(format!("{} compliance tag hits (+{})", hits, 25 * hits));
        }
    }

    if let Some(required) = prefs.required_data_residency {
        if residency_satisfied(required, profile) {
            *score += 200.0;
            reasons.push(format!("residency {:?} satisfied (+200)", required));
        } else {
            *score -= 5000.0;
            reasons.push(format!("residency {:?} not satisfied (-5000)", required));
        }
    } else if prefs
        .preferred_data_residency
        .iter()
        .any(|r| residency_satisfied(*r, profile))
    {
        *score += 75.0;
        reasons.push("preferred residency satisfied (+75)".into());
    }

    if prefs.requires_on_prem {
        if is_local_deployment(profile) {
            *score += 250.0;
            reasons.push("on-prem deployment (+250)".into());
        } else {
            *score -= 6000.0;
            reasons.push("on-prem required but deployment is remote (-6000)".into());
        }
    }

    if !prefs.info_types.is_empty() {
        let supported = supported_info_types(profile);
        let hits = prefs
            .info_types
            .iter()
            .filter(|t| supported.iter().any(|s| s.eq_ignore_ascii_case(t.as_str())))
            .count();
        if hits > 0 {
            *score += 20.0 * hits as f64;
            reasons.push(format!("{} info type hits (+{})", hits, 20 * hits));
        } else {
            *score -= 40.0;
            reasons.push("no info type overlap (-40)".into());
        }
    }

    if let Some(required) = prefs.required_context_window_tokens {
        let cap = profile
            .limits
            .as_ref()
            .and_then(|l| l.context_window_tokens)
            .unwrap_or(8192);
        if cap < required {
            *score -= 1000.0;
            reasons.push(format!("context window {} below required {} (-1000)", cap, required));
        } else {
            let boost = (((cap - required) as f64) / 100.0).min(100.0);
            *score += boost;
            reasons.push(format!("context window {} (+{:.1})", cap, boost));
        }
    }

    if let Some(required) = prefs.model_strength {
        let actual = effective_strength(profile);
        if actual == Some(required) {
            *score += 60.0;
            reasons.push(format!("strength {:?} exact match (+60)", required));
        } else {
            let actual_rank = actual.map(ModelStrength::rank).unwrap_or(0);
            let delta = 10.0 * (actual_rank - required.rank()) as f64;
            *score += delta;
            reasons.push(format!("strength rank delta ({:+.0})", delta));
        }
    }

    if let Some(budget) = prefs.latency_budget_ms {
        if let Some(p95) = perf.and_then(|p| p.p95_latency_ms) {
            if p95 > budget {
                let penalty = ((p95 - budget) / 2.0).min(800.0);
                *score -= penalty;
                reasons.push(format!("p95 {}ms over budget {}ms (-{:.1})", p95, budget, penalty));
            } else {
                let boost = ((budget - p95) / 3.0).min(200.0);
                *score += boost;
                reasons.push(format!("p95 {}ms under budget {}ms (+{:.1})", p95, budget, boost));
            }
        }
    }

    if let Some(cap) = prefs.max_cost_per_1k {
        if let Some(price) = profile.cost.as_ref().and_then(|c| c.per_1k_tokens) {
            if price > cap {
                *score -= 1200.0;
                reasons.push(format!("cost {} over cap {} (-1200)", price, cap));
            } else {
                let boost = ((cap - price) * 10.0).min(120.0);
                *score += boost;
                reasons.push(format!("cost {} under cap {} (+{:.1})", price, cap, boost));
            }
        }
    }

    if let Some(min_quality) = prefs.min_quality_score {
        if let Some(q) = profile.quality.as_ref().and_then(|q| q.score) {
            if q < min_quality {
                *score -= 600.0;
                reasons.push(format!("quality {} below minimum {} (-600)", q, min_quality));
            } else {
                let boost = ((q - min_quality) * 20.0).min(150.0);
                *score += boost;
                reasons.push(format!("quality {} (+{:.1})", q, boost));
            }
        }
    }

    if let Some(required) = prefs.required_output_tokens {
        if let Some(max_out) = profile.limits.as_ref().and_then(|l| l.max_output_tokens) {
            if max_out < required {
                *score -= 1000.0;
                reasons.push(format!("max output {} below required {} (-1000)", max_out, required));
            } else {
                *score += 40.0;
                reasons.push("output token requirement met (+40)".into());
            }
        }
    }

    let feature_checks: [(bool, &[&str], f64, &str); 4] = [
        (prefs.requires_json_mode, &["json_mode"], 800.0, "json mode"),
        (prefs.requires_function_calling, &["function_calling"], 800.0, "function calling"),
        (prefs.requires_streaming, &["streaming"], 400.0, "streaming"),
        (prefs.requires_vision, &["vision", "multimodal"], 900.0, "vision"),
    ];
    for (required, keys, penalty, label) in feature_checks {
        if required && !capability_present(profile, keys) {
            *score -= penalty;
            reasons.push(format!("{} missing (-{})", label, penalty));
        }
    }
}

/// A capability counts when a capability string and feature key contain one
/// another case-insensitively, or the tag with the feature key is `true`.
fn capability_present(profile: &ModelProfile, keys: &[&str]) -> bool {
    if keys.iter().any(|k| profile.tag_flag(k)) {
        return true;
    }
    profile.capabilities.iter().any(|cap| {
        let cap = cap.to_lowercase();
        keys.iter().any(|k| k.contains(cap.as_str()) || cap.contains(k))
    })
}

fn is_local_deployment(profile: &ModelProfile) -> bool {
    profile
        .tag_str("deployment")
        .map(|d| LOCAL_DEPLOYMENTS.iter().any(|l| d.eq_ignore_ascii_case(l)))
        .unwrap_or(false)
}

fn data_residency(profile: &ModelProfile) -> Option<&str> {
    profile.compliance.as_ref().and_then(|c| c.data_residency.as_deref())
}

/// Residency satisfaction shared by required and preferred checks.
pub fn residency_satisfied(req: ResidencyRequirement, profile: &ModelProfile) -> bool {
    match req {
        ResidencyRequirement::Auto => true,
        ResidencyRequirement::AuOnshore => {
            data_residency(profile).map(|r| r.eq_ignore_ascii_case("AU")).unwrap_or(false)
        }
        ResidencyRequirement::AuLocal => {
            data_residency(profile).map(|r| r.eq_ignore_ascii_case("AU")).unwrap_or(false)
                && is_local_deployment(profile)
        }
        ResidencyRequirement::OnPremise => is_local_deployment(profile),
    }
}

/// Caller compliance tags hit on certifications or string tag values.
fn compliance_tag_hits(profile: &ModelProfile, tags: &[String]) -> usize {
    tags.iter()
        .filter(|t| {
            let t = t.as_str();
            let cert_hit = profile
                .compliance
                .as_ref()
                .map(|c| c.certifications.iter().any(|cert| cert.eq_ignore_ascii_case(t)))
                .unwrap_or(false);
            let tag_hit = profile
                .tags
                .values()
                .filter_map(serde_json::Value::as_str)
                .any(|v| v.eq_ignore_ascii_case(t));
            cert_hit || tag_hit
        })
        .count()
}

/// Union of supported data classes and the `info_types` tag.
fn supported_info_types(profile: &ModelProfile) -> Vec<String> {
    let mut out: Vec<String> = profile.supported_data_classes.clone();
    match profile.tags.get("info_types") {
        Some(serde_json::Value::Array(items)) => {
            out.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)));
        }
        Some(serde_json::Value::String(s)) => {
            out.extend(s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));
        }
        _ => {}
    }
    out
}

/// Declared strength, or derived from the `cost_tier` tag when unset.
fn effective_strength(profile: &ModelProfile) -> Option<ModelStrength> {
    if let Some(s) = profile.quality.as_ref().and_then(|q| q.strength) {
        return Some(s);
    }
    match profile.tag_str("cost_tier").map(str::to_lowercase).as_deref() {
        Some("premium") | Some("quality") => Some(ModelStrength::Strong),
        Some("balanced") | Some("standard") => Some(ModelStrength::Standard),
        Some("economy") | Some("lite") => Some(ModelStrength::Lite),
        _ => None,
    }
}
