//! Section pipeline: Plan → Draft → Verify → (Repair) → Final.
//!
//! Each stage appends a [`SectionArtifact`], so the returned trail is an
//! ordered audit log of how the final text came to be. Repair runs once,
//! only when verification reported something; the final draft is not
//! re-verified here.

use std::collections::BTreeMap;

use serde_json::json;

use crate::config::{Blueprint, PipelineConfig};
use crate::evidence::EvidenceBundle;
use crate::policy::CitationPolicy;
use crate::repair::{generate_repair_instructions, repair_section};
use crate::types::{
    ArtifactStage, Claim, Priority, SectionArtifact, SectionDraft, SectionPlan, VerificationIssue,
};
use crate::verification::patterns::citation_marker;
use crate::verification::{verify_section, VerificationRequest};

/// Produces a draft from a plan and its evidence.
pub trait SectionWriter {
    fn write(
        &self,
        plan: &SectionPlan,
        evidence: &EvidenceBundle,
        policy: CitationPolicy,
    ) -> SectionDraft;
}

/// Deterministic writer: one bullet claim per outline entry under a
/// `# Summary` heading.
///
/// Under citation-requiring policies each claim cites the bundle's first
/// item, when there is one.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineWriter;

impl SectionWriter for OutlineWriter {
    fn write(
        &self,
        plan: &SectionPlan,
        evidence: &EvidenceBundle,
        policy: CitationPolicy,
    ) -> SectionDraft {
        let cited = evidence.first_id().filter(|_| policy.requires_citations());

        let mut lines = vec!["# Summary".to_string()];
        let mut claims = Vec::with_capacity(plan.outline.len());

        for (position, entry) in plan.outline.iter().enumerate() {
            let text = format!("{} insight {}", entry, position + 1);
            let claim = Claim::cited(text, cited);

            match cited {
                Some(id) => lines.push(format!("- {} {}", claim.text, citation_marker(id))),
                None => lines.push(format!("- {}", claim.text)),
            }
            claims.push(claim);
        }

        SectionDraft::new(lines.join("\n"), claims)
    }
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOutcome {
    /// Ordered audit trail
    pub artifacts: Vec<SectionArtifact>,

    /// Findings from verifying the first draft
    pub issues: Vec<VerificationIssue>,

    /// Issue messages carried into the final artifact
    pub notes: Vec<String>,

    pub final_draft: SectionDraft,
}

/// Claim text to the evidence ids backing it.
pub fn build_claim_to_evidence_map(claims: &[Claim]) -> BTreeMap<String, Vec<String>> {
    claims
        .iter()
        .map(|claim| (claim.text.clone(), claim.evidence_ids.clone()))
        .collect()
}

/// Runs sections through drafting, verification and repair.
pub struct SectionPipeline<W = OutlineWriter> {
    config: PipelineConfig,
    writer: W,
}

impl SectionPipeline<OutlineWriter> {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            writer: OutlineWriter,
        }
    }
}

impl<W: SectionWriter> SectionPipeline<W> {
    pub fn with_writer(config: PipelineConfig, writer: W) -> Self {
        Self { config, writer }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(
        &self,
        plan: &SectionPlan,
        evidence: &EvidenceBundle,
        policy: CitationPolicy,
        blueprint: &Blueprint,
        prior_sections: &[String],
    ) -> SectionOutcome {
        let mut artifacts = Vec::new();

        artifacts.push(
            SectionArtifact::new(ArtifactStage::Plan, plan.outline.join("\n"))
                .with_metadata("constraints", json!(plan.constraints))
                .with_metadata("priority", json!(plan.priority)),
        );

        let draft = self.writer.write(plan, evidence, policy);
        tracing::info!(policy = %policy, claims = draft.claims.len(), "Section drafted");
        artifacts.push(
            SectionArtifact::new(ArtifactStage::Draft, draft.markdown.clone())
                .with_metadata("claims", json!(draft.claims)),
        );

        let issues = verify_section(&VerificationRequest {
            markdown: &draft.markdown,
            claims: &draft.claims,
            policy,
            evidence,
            blueprint,
            prior_sections,
            formatting: &self.config.formatting,
        });
        artifacts.push(
            SectionArtifact::new(ArtifactStage::VerifiedDraft, draft.markdown.clone())
                .with_metadata("issues", json!(issues)),
        );

        let (final_draft, notes) = if issues.is_empty() {
            (draft, Vec::new())
        } else {
            tracing::info!(issues = issues.len(), "Repairing section");
            let codes: Vec<&str> = issues.iter().map(|issue| issue.code.as_str()).collect();
            let checklist = generate_repair_instructions(&issues);
            artifacts.push(
                SectionArtifact::new(ArtifactStage::ReviewNotes, checklist)
                    .with_metadata("issue_codes", json!(codes)),
            );

            let notes = issues.iter().map(|issue| issue.message.clone()).collect();
            (repair_section(&draft, &issues, evidence, policy), notes)
        };

        let claim_to_evidence = if plan.priority == Priority::P1 {
            build_claim_to_evidence_map(&final_draft.claims)
        } else {
            BTreeMap::new()
        };

        artifacts.push(
            SectionArtifact::new(ArtifactStage::Final, final_draft.markdown.clone())
                .with_metadata("claims", json!(final_draft.claims))
                .with_metadata("claim_to_evidence", json!(claim_to_evidence))
                .with_metadata("open_questions", json!(final_draft.open_questions))
                .with_metadata("notes", json!(notes)),
        );

        SectionOutcome {
            artifacts,
            issues,
            notes,
            final_draft,
        }
    }
}

/// Run one section with the deterministic writer.
pub fn run_section_pipeline(
    plan: &SectionPlan,
    evidence: &EvidenceBundle,
    policy: CitationPolicy,
    blueprint: &Blueprint,
    prior_sections: &[String],
    config: &PipelineConfig,
) -> SectionOutcome {
    SectionPipeline::new(config.clone()).run(plan, evidence, policy, blueprint, prior_sections)
}
