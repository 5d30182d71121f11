//! Response normalization.
//!
//! The verification service's payload is not trusted to be complete or
//! well-typed. [`normalize`] is a total function: it never fails and every
//! field of [`VerificationResult`] is defaulted when the payload omits it,
//! sets it to `null`, or gives it an unexpected shape. Falsy values (`0`,
//! `""`, `null`, `false`) fall back to the default the same way.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::result::{
    Citation, CitationCheck, CitationVerification, Claim, ClaimStatus, VerificationResult,
};

pub const DEFAULT_DOMAIN: &str = "general";

/// Coerce a raw service payload into a complete [`VerificationResult`].
///
/// `task_id` is read by [`crate::task::resolve_or`], never copied here.
pub fn normalize(payload: &Value) -> VerificationResult {
    let claims: Vec<Claim> = payload
        .get("claims")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_claim).collect())
        .unwrap_or_default();

    let total_claims = payload
        .get("total_claims")
        .and_then(as_count)
        .filter(|n| *n > 0)
        .unwrap_or(claims.len() as u64);

    VerificationResult {
        domain: non_empty_str(payload.get("domain"))
            .unwrap_or(DEFAULT_DOMAIN)
            .to_string(),
        total_claims,
        overall_reliability: payload
            .get("overall_reliability")
            .and_then(as_score)
            .unwrap_or(0.0),
        claims,
        extracted_citations: payload
            .get("extracted_citations")
            .and_then(Value::as_object)
            .map(normalize_extracted)
            .unwrap_or_default(),
        citation_verification: payload
            .get("citation_verification")
            .and_then(Value::as_object)
            .map(normalize_citation_verification)
            .unwrap_or_default(),
    }
}

fn normalize_claim(value: &Value) -> Option<Claim> {
    let obj = value.as_object()?;
    Some(Claim {
        claim: str_field(obj, "claim"),
        status: non_empty_str(obj.get("status"))
            .map(ClaimStatus::parse)
            .unwrap_or(ClaimStatus::Error),
        confidence: obj.get("confidence").and_then(as_score).unwrap_or(0.0),
        similarity: obj.get("similarity").and_then(as_score).unwrap_or(0.0),
        credibility: obj.get("credibility").and_then(as_score).unwrap_or(0.0),
        contradicted: obj.get("contradicted").is_some_and(is_truthy),
        citations: obj
            .get("citations")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(normalize_citation).collect())
            .unwrap_or_default(),
        explanation: str_field(obj, "explanation"),
    })
}

fn normalize_citation(value: &Value) -> Option<Citation> {
    match value {
        Value::Object(obj) => Some(Citation {
            title: str_field(obj, "title"),
            url: str_field(obj, "url"),
        }),
        Value::String(url) if !url.is_empty() => Some(Citation {
            title: String::new(),
            url: url.clone(),
        }),
        _ => None,
    }
}

fn normalize_citation_check(value: &Value) -> Option<CitationCheck> {
    match value {
        Value::Object(obj) => Some(CitationCheck {
            title: str_field(obj, "title"),
            url: str_field(obj, "url"),
            error: non_empty_str(obj.get("error")).map(str::to_string),
        }),
        Value::String(url) if !url.is_empty() => Some(CitationCheck {
            url: url.clone(),
            ..Default::default()
        }),
        _ => None,
    }
}

fn normalize_extracted(obj: &Map<String, Value>) -> BTreeMap<String, Vec<String>> {
    obj.iter()
        .filter_map(|(kind, v)| {
            let values = match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect(),
                Value::String(s) if !s.is_empty() => vec![s.clone()],
                _ => return None,
            };
            Some((kind.clone(), values))
        })
        .collect()
}

fn normalize_citation_verification(obj: &Map<String, Value>) -> CitationVerification {
    let checks = |key: &str| -> Vec<CitationCheck> {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(normalize_citation_check).collect())
            .unwrap_or_default()
    };
    let verified = checks("verified");
    let invalid = checks("invalid");

    let total = obj
        .get("total")
        .and_then(as_count)
        .filter(|n| *n > 0)
        .unwrap_or((verified.len() + invalid.len()) as u64);

    let verification_rate = obj
        .get("verification_rate")
        .and_then(as_score)
        .unwrap_or_else(|| {
            if total > 0 {
                (verified.len() as f64 / total as f64).clamp(0.0, 1.0)
            } else {
                0.0
            }
        });

    CitationVerification {
        verified,
        invalid,
        total,
        verification_rate,
    }
}

/// Read a string field, defaulting to empty.
fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Interpret a JSON number or numeric string as a float.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// A non-negative integer count. Fractions are truncated.
pub(crate) fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    as_f64(value).filter(|n| *n >= 0.0).map(|n| n as u64)
}

/// A score clamped into `[0, 1]`.
fn as_score(value: &Value) -> Option<f64> {
    as_f64(value).map(|n| n.clamp(0.0, 1.0))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JSON truthiness of a whole payload; a falsy success body is malformed.
pub fn is_empty_payload(value: &Value) -> bool {
    !is_truthy(value)
}
