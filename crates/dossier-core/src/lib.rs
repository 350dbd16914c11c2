//! # dossier-core
//!
//! Deterministic evidence pipeline for report sections.
//!
//! This crate answers, for every drafted section:
//! - Is every claim backed by evidence the policy allows?
//! - What can be repaired automatically, and what needs a human?
//! - How good is the evidence behind it?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output (recency
//!    scoring takes an explicit `now` via [`score_section_at`])
//! 2. **No model calls**: Drafts arrive as text; all checks are rule-based
//! 3. **Findings are data**: Verification never fails, it returns issues
//! 4. **Independent checks**: No check reads another check's findings
//!
//! ## Example
//!
//! ```rust,ignore
//! use dossier_core::{Blueprint, CitationPolicy, PipelineConfig, SectionPlan, run_section_pipeline};
//!
//! let config = PipelineConfig::from_yaml_file("pipeline.yaml")?;
//! let blueprint = Blueprint::from_yaml_file("blueprint.yaml")?;
//! let plan = SectionPlan::new(["Market size", "Competitors"]);
//!
//! let outcome = run_section_pipeline(&plan, &bundle, CitationPolicy::VectorWeb, &blueprint, &[], &config);
//! for artifact in &outcome.artifacts {
//!     println!("{:?}: {}", artifact.stage, artifact.content);
//! }
//! ```

pub mod config;
pub mod dashboard;
pub mod evidence;
pub mod footnotes;
pub mod pipeline;
pub mod policy;
pub mod repair;
pub mod scoring;
pub mod types;
pub mod verification;

// Re-export main types at crate root
pub use config::{
    validate_pipeline_schema, Blueprint, ConfigError, FormattingRequirements, PipelineConfig,
    ScoringConfig,
};
pub use dashboard::{aggregate_report_scores, build_dashboard, Dashboard, ReportSummary, SectionRow};
pub use evidence::{
    json_contains, parse_timestamp, EvidenceBundle, EvidenceError, EvidenceItem, EvidenceKind,
    RetrievalFilters,
};
pub use footnotes::{Citation, CitationFormatter};
pub use pipeline::{
    build_claim_to_evidence_map, run_section_pipeline, OutlineWriter, SectionOutcome,
    SectionPipeline, SectionWriter,
};
pub use policy::{CitationPolicy, PolicyError, RetrievalPolicy};
pub use repair::{generate_repair_instructions, repair_section};
pub use scoring::{clamp_score, score_section, score_section_at};
pub use types::{
    ArtifactStage, Claim, IssueCode, Priority, ReportRun, SectionArtifact, SectionDraft,
    SectionPlan, SectionRun, SectionScores, Severity, VerificationIssue,
};
pub use verification::{
    passes, verify_section, CitationCheck, Check, ContradictionCheck, EvidencePolicyCheck,
    FormattingCheck, VerificationRequest,
};
