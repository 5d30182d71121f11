//! Human-readable rendering of a [`VerificationResult`].

use std::fmt::Write;

use console::style;

use crate::result::{Claim, ClaimStatus, VerificationResult};
use crate::ui::icons::{BOOK, CHECK, CROSS, LINK, PROGRESS, SEARCH, WARN};

fn percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

fn status_icon(status: ClaimStatus) -> String {
    match status {
        ClaimStatus::Verified => format!("{}{}", CHECK, style("VERIFIED").green().bold()),
        ClaimStatus::Hallucinated => format!("{}{}", CROSS, style("HALLUCINATED").red().bold()),
        ClaimStatus::Error => format!("{}{}", WARN, style("ERROR").yellow().bold()),
    }
}

fn render_claim(out: &mut String, index: usize, claim: &Claim) {
    let _ = writeln!(out, "{}. {}", index + 1, status_icon(claim.status));
    let _ = writeln!(out, "   {}", claim.claim);
    let _ = writeln!(
        out,
        "   {}",
        style(format!(
            "confidence {} | similarity {} | credibility {}{}",
            percent(claim.confidence),
            percent(claim.similarity),
            percent(claim.credibility),
            if claim.contradicted { " | contradicted" } else { "" }
        ))
        .dim()
    );
    if !claim.explanation.is_empty() {
        let _ = writeln!(out, "   {}", claim.explanation);
    }
    for citation in &claim.citations {
        let title = if citation.title.is_empty() {
            citation.url.as_str()
        } else {
            citation.title.as_str()
        };
        let _ = writeln!(out, "   {}{} {}", LINK, title, style(&citation.url).dim());
    }
}

/// Render a result as a multi-line report.
pub fn render_result(result: &VerificationResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{}{}", PROGRESS, style("Verification Results").bold());
    let _ = writeln!(out, "====================");
    let _ = writeln!(out, "Domain:              {}", result.domain);
    let _ = writeln!(out, "Claims:              {}", result.total_claims);
    let _ = writeln!(
        out,
        "Overall reliability: {}",
        style(percent(result.overall_reliability)).cyan()
    );
    let _ = writeln!(
        out,
        "Verified: {}  Hallucinated: {}",
        style(result.verified_count()).green(),
        style(result.hallucinated_count()).red()
    );

    if !result.claims.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}{}", SEARCH, style("Claims").bold());
        for (i, claim) in result.claims.iter().enumerate() {
            render_claim(&mut out, i, claim);
        }
    }

    let extracted: Vec<_> = result
        .extracted_citations
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .collect();
    if !extracted.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}{}", BOOK, style("Citations found in input").bold());
        for (kind, values) in extracted {
            let _ = writeln!(out, "  {}:", kind);
            for value in values {
                let _ = writeln!(out, "    - {}", value);
            }
        }
    }

    let cv = &result.citation_verification;
    if cv.total > 0 {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Citation check: {}/{} verified ({})",
            cv.verified.len(),
            cv.total,
            percent(cv.verification_rate)
        );
        for invalid in &cv.invalid {
            let reason = invalid.error.as_deref().unwrap_or("could not be verified");
            let _ = writeln!(out, "  {}{} {}", CROSS, invalid.url, style(reason).dim());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    #[test]
    fn test_render_includes_summary_and_claims() {
        let result = normalize(&json!({
            "domain": "science",
            "total_claims": 1,
            "overall_reliability": 0.95,
            "claims": [{
                "claim": "The Earth orbits the Sun.",
                "status": "verified",
                "confidence": 0.97,
                "citations": [{"title": "NASA", "url": "https://nasa.gov"}],
                "explanation": "Confirmed."
            }]
        }));
        let text = console::strip_ansi_codes(&render_result(&result)).to_string();
        assert!(text.contains("Domain:              science"));
        assert!(text.contains("95%"));
        assert!(text.contains("The Earth orbits the Sun."));
        assert!(text.contains("VERIFIED"));
        assert!(text.contains("https://nasa.gov"));
    }

    #[test]
    fn test_render_empty_result() {
        let text = console::strip_ansi_codes(&render_result(&normalize(&json!({})))).to_string();
        assert!(text.contains("general"));
        assert!(!text.contains("Claims\n"));
        assert!(!text.contains("Citation check"));
    }

    #[test]
    fn test_render_invalid_citations() {
        let result = normalize(&json!({
            "citation_verification": {
                "verified": [],
                "invalid": [{"url": "https://dead.link", "error": "404"}]
            }
        }));
        let text = console::strip_ansi_codes(&render_result(&result)).to_string();
        assert!(text.contains("Citation check: 0/1 verified (0%)"));
        assert!(text.contains("https://dead.link"));
        assert!(text.contains("404"));
    }
}
