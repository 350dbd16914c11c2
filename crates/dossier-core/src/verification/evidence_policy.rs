//! Evidence-policy compliance.
//!
//! Under a citation-requiring policy every claim must cite at least one
//! evidence id and every cited id must exist in the bundle. Under any other
//! policy a claim citing evidence is itself a violation.

use crate::evidence::EvidenceBundle;
use crate::policy::CitationPolicy;
use crate::types::{Claim, IssueCode, VerificationIssue};

use super::{Check, VerificationRequest};

pub struct EvidencePolicyCheck;

impl EvidencePolicyCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        claims: &[Claim],
        policy: CitationPolicy,
        evidence: &EvidenceBundle,
    ) -> Vec<VerificationIssue> {
        let mut issues = Vec::new();
        let requires_citations = policy.requires_citations();

        for claim in claims {
            if !requires_citations {
                if !claim.evidence_ids.is_empty() {
                    issues.push(VerificationIssue::new(
                        IssueCode::UnexpectedEvidence,
                        format!(
                            "Claim '{}' should not include evidence under {} policy.",
                            claim.text, policy
                        ),
                    ));
                }
                continue;
            }

            if claim.evidence_ids.is_empty() {
                issues.push(VerificationIssue::new(
                    IssueCode::EvidenceMissing,
                    format!("Claim '{}' lacks evidence under {} policy.", claim.text, policy),
                ));
            }

            for evidence_id in claim.evidence_ids.iter().filter(|id| !evidence.has(id)) {
                issues.push(VerificationIssue::new(
                    IssueCode::EvidenceUnknown,
                    format!(
                        "Claim '{}' references unknown evidence '{}'.",
                        claim.text, evidence_id
                    ),
                ));
            }
        }

        issues
    }
}

impl Default for EvidencePolicyCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for EvidencePolicyCheck {
    fn name(&self) -> &'static str {
        "evidence_policy"
    }

    fn run(&self, request: &VerificationRequest<'_>) -> Vec<VerificationIssue> {
        Self::check(request.claims, request.policy, request.evidence)
    }
}
