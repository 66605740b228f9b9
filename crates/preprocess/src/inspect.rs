//! Regex-based content inspection: PII entities, profanity, risk keywords
//! and the possible-copyright heuristic. Deterministic; no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

// Loose international form; candidates are filtered to >= 8 digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{6,}\d").unwrap());

static ID_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{8,16}\b").unwrap());

// 13-19 digit runs with optional space/hyphen separators; Luhn-checked after.
static CARD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){12,18}\d\b").unwrap());

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,5}\s+(?:[A-Za-z][A-Za-z']*\s+){1,40}(?:Street|St|Road|Rd|Avenue|Ave|Boulevard|Blvd|Lane|Ln|Drive|Dr|Court|Ct)\b",
    )
    .unwrap()
});

static ABN_PREFIXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bABN[\s:]*((?:\d\s?){10}\d)\b").unwrap());
static ABN_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{11}\b").unwrap());

static TFN_PREFIXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTFN[\s:]*((?:\d\s?){7,8}\d)\b").unwrap());
static TFN_BARE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{8,9}\b").unwrap());

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());

static PROFANITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:fuck|shit|bitch|bastard|asshole|wanker|bullshit|dickhead|crap)\b")
        .unwrap()
});

static QUOTED_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]{120,}"|'[^']{120,}'"#).unwrap());

const RISK_GROUPS: &[(&str, &[&str])] = &[
    ("violence", &["kill", "murder", "assault", "weapon", "bomb", "shoot", "stab", "massacre"]),
    ("hate", &["racist", "bigot", "nazi", "supremacist", "ethnic cleansing", "hate speech"]),
    (
        "self_harm",
        &["suicide", "self-harm", "self harm", "kill myself", "end my life", "overdose"],
    ),
    ("adult", &["porn", "pornographic", "explicit sexual", "nsfw", "erotic"]),
];

static RISK_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    RISK_GROUPS
        .iter()
        .map(|(flag, terms)| (*flag, term_regex(terms)))
        .collect()
});

/// Build a whole-word, case-insensitive alternation over a term list.
pub(crate) fn term_regex(terms: &[&str]) -> Regex {
    let alternation =
        terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
}

/// Entities and flags derived from the payload's message text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inspection {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub id_numbers: Vec<String>,
    pub credit_cards: Vec<String>,
    pub addresses: Vec<String>,
    pub abns: Vec<String>,
    pub tfns: Vec<String>,
    pub ssns: Vec<String>,
    pub profanities: Vec<String>,
    pub risk_flags: Vec<String>,
    pub possible_copyrighted: bool,
    /// True when an ABN/TFN match carried its explicit prefix.
    pub abn_prefixed: bool,
    pub tfn_prefixed: bool,
}

impl Inspection {
    /// PII kinds present, in the stable reporting order.
    pub fn pii_types(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.emails.is_empty() {
            out.push("email");
        }
        if !self.phones.is_empty() {
            out.push("phone");
        }
        if !self.id_numbers.is_empty() {
            out.push("id_number");
        }
        if !self.credit_cards.is_empty() {
            out.push("credit_card");
        }
        if !self.addresses.is_empty() {
            out.push("address");
        }
        if !self.abns.is_empty() {
            out.push("abn");
        }
        if !self.tfns.is_empty() {
            out.push("tfn");
        }
        if !self.ssns.is_empty() {
            out.push("ssn");
        }
        out
    }

    pub fn contains_pii(&self) -> bool {
        !self.pii_types().is_empty()
    }
}

/// Prefer the most recent chat message authored by the user or system (or
/// with no role at all); fall back to a top-level `message` string.
pub fn extract_message_text(payload: &Value) -> String {
    if let Some(messages) = payload.get("messages").and_then(Value::as_array) {
        for item in messages.iter().rev() {
            let role = item.get("role").and_then(Value::as_str);
            let role_ok = matches!(role, None | Some("user") | Some("system"));
            if role_ok {
                if let Some(content) = item.get("content").and_then(Value::as_str) {
                    return content.to_string();
                }
            }
        }
    }
    payload.get("message").and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Luhn checksum over a digit string.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for c in digits.chars().rev() {
        let Some(d) = c.to_digit(10) else { return false };
        let mut d = d;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    !digits.is_empty() && sum % 10 == 0
}

fn collect(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let s = m.as_str().to_string();
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}

/// Inspect the message text. Same text always yields the same inspection.
pub fn inspect(text: &str) -> Inspection {
    let mut insp = Inspection {
        emails: collect(&EMAIL_RE, text),
        ..Inspection::default()
    };

    insp.phones = collect(&PHONE_RE, text)
        .into_iter()
        .filter(|p| digit_count(p) >= 8)
        .collect();

    insp.id_numbers = collect(&ID_NUMBER_RE, text);

    for m in CARD_RE.find_iter(text) {
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        if (13..=19).contains(&digits.len())
            && luhn_valid(&digits)
            && !insp.credit_cards.contains(&digits)
        {
            insp.credit_cards.push(digits);
        }
    }

    insp.addresses = collect(&ADDRESS_RE, text);

    for m in ABN_PREFIXED_RE.captures_iter(text) {
        let digits: String = m[1].chars().filter(char::is_ascii_digit).collect();
        if !insp.abns.contains(&digits) {
            insp.abns.push(digits);
            insp.abn_prefixed = true;
        }
    }
    for m in ABN_BARE_RE.find_iter(text) {
        let digits = m.as_str().to_string();
        if !insp.abns.contains(&digits) {
            insp.abns.push(digits);
        }
    }

    for m in TFN_PREFIXED_RE.captures_iter(text) {
        let digits: String = m[1].chars().filter(char::is_ascii_digit).collect();
        if !insp.tfns.contains(&digits) {
            insp.tfns.push(digits);
            insp.tfn_prefixed = true;
        }
    }

    insp.ssns = collect(&SSN_RE, text);

    insp.profanities = collect(&PROFANITY_RE, text)
        .into_iter()
        .map(|p| p.to_lowercase())
        .collect();

    for (flag, re) in RISK_RES.iter() {
        if re.is_match(text) {
            insp.risk_flags.push((*flag).to_string());
        }
    }

    let lower = text.to_lowercase();
    insp.possible_copyrighted = text.contains('©')
        || lower.contains("all rights reserved")
        || QUOTED_SPAN_RE.is_match(text);

    // Bare TFN candidates only count when the prefix form did not already
    // match; an 11-digit ABN also matches the 8-16 digit id pattern, which
    // is expected overlap.
    if insp.tfns.is_empty() {
        insp.tfns = TFN_BARE_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .filter(|d| !insp.abns.contains(d))
            .collect();
    }

    insp
}
