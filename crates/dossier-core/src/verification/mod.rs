//! Verification engine.
//!
//! Four independent checks run against every drafted section:
//!
//! | Check | Codes |
//! |-------|-------|
//! | [`EvidencePolicyCheck`] | `EVIDENCE_MISSING`, `EVIDENCE_UNKNOWN`, `UNEXPECTED_EVIDENCE` |
//! | [`CitationCheck`] | `CITATIONS_MISSING`, `CITATION_FORMAT`, `CITATION_MISMATCH` |
//! | [`ContradictionCheck`] | `CONTRADICTION`, `REDUNDANCY_INTERNAL`, `REDUNDANCY_PRIOR` |
//! | [`FormattingCheck`] | `TOO_SHORT`, `MISSING_HEADING` |
//!
//! All checks always run and their findings are concatenated in the order
//! above. Findings are data, never errors: a section passes when none of
//! them has ERROR severity.

mod citations;
mod contradictions;
mod evidence_policy;
mod formatting;
pub mod patterns;

pub use citations::CitationCheck;
pub use contradictions::ContradictionCheck;
pub use evidence_policy::EvidencePolicyCheck;
pub use formatting::FormattingCheck;

use crate::config::{Blueprint, FormattingRequirements};
use crate::evidence::EvidenceBundle;
use crate::policy::CitationPolicy;
use crate::types::{Claim, VerificationIssue};

/// Everything a check may look at.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub markdown: &'a str,
    pub claims: &'a [Claim],
    pub policy: CitationPolicy,
    pub evidence: &'a EvidenceBundle,
    pub blueprint: &'a Blueprint,
    pub prior_sections: &'a [String],
    pub formatting: &'a FormattingRequirements,
}

/// A single verification rule family.
///
/// # Isolation Contract
/// - MUST NOT depend on another check's findings
/// - MUST be a pure function of the request
pub trait Check {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, request: &VerificationRequest<'_>) -> Vec<VerificationIssue>;
}

/// Run every check and concatenate the findings.
pub fn verify_section(request: &VerificationRequest<'_>) -> Vec<VerificationIssue> {
    let checks: [&dyn Check; 4] = [
        &EvidencePolicyCheck,
        &CitationCheck,
        &ContradictionCheck,
        &FormattingCheck,
    ];

    let mut issues = Vec::new();
    for check in checks {
        let found = check.run(request);
        tracing::debug!(check = check.name(), issues = found.len(), "Check complete");
        issues.extend(found);
    }

    let errors = issues.iter().filter(|issue| issue.is_error()).count();
    if errors > 0 {
        tracing::warn!(
            policy = %request.policy,
            errors,
            warnings = issues.len() - errors,
            "Section failed verification"
        );
    }

    issues
}

/// True when no finding has ERROR severity.
pub fn passes(issues: &[VerificationIssue]) -> bool {
    !issues.iter().any(VerificationIssue::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceItem;
    use crate::types::{IssueCode, Severity};

    fn bundle() -> EvidenceBundle {
        EvidenceBundle::new(vec![EvidenceItem::new("ev1", "data point").with_source("vector")])
            .unwrap()
    }

    fn blueprint() -> Blueprint {
        Blueprint::new(["service must be reliable"], ["do not mention outage"])
    }

    #[test]
    fn test_clean_section_has_no_errors() {
        let evidence = bundle();
        let blueprint = blueprint();
        let claims = vec![Claim::cited("Service must be reliable", ["ev1"])];
        let formatting = FormattingRequirements {
            required_headings: vec!["Summary".to_string()],
            min_words: 3,
        };

        let issues = verify_section(&VerificationRequest {
            markdown: "# Summary\n- Service must be reliable [citation:ev1]",
            claims: &claims,
            policy: CitationPolicy::VectorOnly,
            evidence: &evidence,
            blueprint: &blueprint,
            prior_sections: &[],
            formatting: &formatting,
        });

        assert!(passes(&issues), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_all_checks_run_without_short_circuit() {
        let evidence = bundle();
        let blueprint = blueprint();
        let claims = vec![Claim::new("Uncited claim")];
        let formatting = FormattingRequirements::default();
        let prior = vec!["Uncited claim. Other text.".to_string()];

        let issues = verify_section(&VerificationRequest {
            markdown: "Uncited claim. Do not mention outage.",
            claims: &claims,
            policy: CitationPolicy::All,
            evidence: &evidence,
            blueprint: &blueprint,
            prior_sections: &prior,
            formatting: &formatting,
        });

        let codes: Vec<IssueCode> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                IssueCode::EvidenceMissing,
                IssueCode::CitationsMissing,
                IssueCode::Contradiction,
                IssueCode::RedundancyPrior,
                IssueCode::TooShort,
                IssueCode::MissingHeading,
            ]
        );
        assert!(!passes(&issues));
    }

    #[test]
    fn test_warnings_do_not_block() {
        let issues = vec![
            VerificationIssue::new(IssueCode::RedundancyInternal, "dup"),
            VerificationIssue::new(IssueCode::RedundancyPrior, "dup"),
        ];
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(passes(&issues));
    }
}
