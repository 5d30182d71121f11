//! Normalized verification result consumed by the presentation layer.
//!
//! Every field is always populated; see [`crate::normalize`] for how a raw
//! service payload is coerced into this shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Verdict for a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Verified,
    Hallucinated,
    Error,
}

impl ClaimStatus {
    /// Parse a service status string; anything unrecognised is `Error`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "verified" => ClaimStatus::Verified,
            "hallucinated" => ClaimStatus::Hallucinated,
            _ => ClaimStatus::Error,
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimStatus::Verified => write!(f, "verified"),
            ClaimStatus::Hallucinated => write!(f, "hallucinated"),
            ClaimStatus::Error => write!(f, "error"),
        }
    }
}

/// A web source supporting or refuting a claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// One extracted claim and its verification scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim: String,
    pub status: ClaimStatus,
    /// All scores are clamped into `[0, 1]`.
    pub confidence: f64,
    pub similarity: f64,
    pub credibility: f64,
    pub contradicted: bool,
    pub citations: Vec<Citation>,
    pub explanation: String,
}

/// A citation found in the submitted text, after the service checked it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationCheck {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationVerification {
    pub verified: Vec<CitationCheck>,
    pub invalid: Vec<CitationCheck>,
    pub total: u64,
    pub verification_rate: f64,
}

/// Fully populated result of one completed submission.
///
/// The raw task identifier is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub domain: String,
    pub total_claims: u64,
    pub overall_reliability: f64,
    pub claims: Vec<Claim>,
    /// Citation kind (e.g. `dois`, `urls`) to the values found in the input.
    pub extracted_citations: BTreeMap<String, Vec<String>>,
    pub citation_verification: CitationVerification,
}

impl VerificationResult {
    pub fn verified_count(&self) -> usize {
        self.claims
            .iter()
            .filter(|c| c.status == ClaimStatus::Verified)
            .count()
    }

    pub fn hallucinated_count(&self) -> usize {
        self.claims
            .iter()
            .filter(|c| c.status == ClaimStatus::Hallucinated)
            .count()
    }
}
