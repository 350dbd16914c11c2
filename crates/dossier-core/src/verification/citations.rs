//! Citation presence and format in the rendered markdown.

use crate::policy::CitationPolicy;
use crate::types::{Claim, IssueCode, VerificationIssue};

use super::patterns::{citation_ids, is_valid_citation_id};
use super::{Check, VerificationRequest};

pub struct CitationCheck;

impl CitationCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        markdown: &str,
        claims: &[Claim],
        policy: CitationPolicy,
    ) -> Vec<VerificationIssue> {
        let mut issues = Vec::new();
        let requires_citations = policy.requires_citations();
        let found = citation_ids(markdown);

        if requires_citations && found.is_empty() {
            issues.push(VerificationIssue::new(
                IssueCode::CitationsMissing,
                "No citations found in markdown despite policy requirement.",
            ));
        }

        for citation in found.iter().filter(|id| !is_valid_citation_id(id)) {
            issues.push(VerificationIssue::new(
                IssueCode::CitationFormat,
                format!("Citation id '{}' is not in the expected format.", citation),
            ));
        }

        if requires_citations {
            for claim in claims {
                for evidence_id in &claim.evidence_ids {
                    if !found.contains(&evidence_id.as_str()) {
                        issues.push(VerificationIssue::new(
                            IssueCode::CitationMismatch,
                            format!(
                                "Claim '{}' references '{}' but no matching citation is present.",
                                claim.text, evidence_id
                            ),
                        ));
                    }
                }
            }
        }

        issues
    }
}

impl Default for CitationCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for CitationCheck {
    fn name(&self) -> &'static str {
        "citations"
    }

    fn run(&self, request: &VerificationRequest<'_>) -> Vec<VerificationIssue> {
        Self::check(request.markdown, request.claims, request.policy)
    }
}
