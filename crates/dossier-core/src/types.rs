//! Value records passed between pipeline stages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::evidence::EvidenceBundle;

/// An assertion in a draft, optionally backed by evidence ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,

    #[serde(default)]
    pub evidence_ids: Vec<String>,
}

impl Claim {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            evidence_ids: Vec::new(),
        }
    }

    pub fn cited<I, S>(text: impl Into<String>, evidence_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            evidence_ids: evidence_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// A drafted section: rendered markdown plus the claims it makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    pub markdown: String,

    #[serde(default)]
    pub claims: Vec<Claim>,

    #[serde(default)]
    pub open_questions: Vec<String>,
}

impl SectionDraft {
    pub fn new(markdown: impl Into<String>, claims: Vec<Claim>) -> Self {
        Self {
            markdown: markdown.into(),
            claims,
            open_questions: Vec::new(),
        }
    }
}

/// Closed set of verification findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    EvidenceMissing,
    EvidenceUnknown,
    UnexpectedEvidence,
    CitationsMissing,
    CitationFormat,
    CitationMismatch,
    Contradiction,
    RedundancyInternal,
    RedundancyPrior,
    TooShort,
    MissingHeading,
}

impl IssueCode {
    /// Redundancy findings are advisory; everything else blocks.
    pub fn default_severity(&self) -> Severity {
        match self {
            IssueCode::RedundancyInternal | IssueCode::RedundancyPrior => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::EvidenceMissing => "EVIDENCE_MISSING",
            IssueCode::EvidenceUnknown => "EVIDENCE_UNKNOWN",
            IssueCode::UnexpectedEvidence => "UNEXPECTED_EVIDENCE",
            IssueCode::CitationsMissing => "CITATIONS_MISSING",
            IssueCode::CitationFormat => "CITATION_FORMAT",
            IssueCode::CitationMismatch => "CITATION_MISMATCH",
            IssueCode::Contradiction => "CONTRADICTION",
            IssueCode::RedundancyInternal => "REDUNDANCY_INTERNAL",
            IssueCode::RedundancyPrior => "REDUNDANCY_PRIOR",
            IssueCode::TooShort => "TOO_SHORT",
            IssueCode::MissingHeading => "MISSING_HEADING",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

/// A coded, severity-tagged finding from verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub code: IssueCode,
    pub message: String,
    pub severity: Severity,
}

impl VerificationIssue {
    /// Create an issue with the code's default severity.
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: code.default_severity(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Stage a content snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactStage {
    Plan,
    Draft,
    VerifiedDraft,
    ReviewNotes,
    Final,
}

/// One entry in a section's append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionArtifact {
    pub stage: ArtifactStage,
    pub content: String,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SectionArtifact {
    pub fn new(stage: ArtifactStage, content: impl Into<String>) -> Self {
        Self {
            stage,
            content: content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    P1,
    #[default]
    P2,
    P3,
}

/// What a section should cover and how to find evidence for it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionPlan {
    pub outline: Vec<String>,

    #[serde(default)]
    pub retrieval_queries: Vec<String>,

    #[serde(default)]
    pub constraints: Vec<String>,

    #[serde(default)]
    pub priority: Priority,
}

impl SectionPlan {
    pub fn new<I, S>(outline: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outline: outline.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Quality metrics for a section, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionScores {
    pub coverage: f64,
    pub diversity: f64,
    pub recency: f64,

    /// Uniqueness: higher means less redundant evidence
    pub redundancy: f64,

    /// Per-metric explanation keyed by metric name
    #[serde(default)]
    pub explanations: BTreeMap<String, String>,
}

/// A section as seen by scoring and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRun {
    pub id: String,
    pub name: String,
    pub evidence_bundle: EvidenceBundle,

    #[serde(default)]
    pub requirements: Vec<String>,

    /// Expected evidence count when no requirements are given (0 = default)
    #[serde(default)]
    pub target_evidence: usize,

    #[serde(default)]
    pub scores: Option<SectionScores>,
}

impl SectionRun {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        evidence_bundle: EvidenceBundle,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            evidence_bundle,
            requirements: Vec::new(),
            target_evidence: 0,
            scores: None,
        }
    }

    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_evidence(mut self, target: usize) -> Self {
        self.target_evidence = target;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRun {
    pub id: String,
    pub title: String,
    pub sections: Vec<SectionRun>,
}
