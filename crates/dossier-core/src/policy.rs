//! Evidence policies.
//!
//! Two independent enumerations live here and must not be mixed up:
//!
//! - [`RetrievalPolicy`] decides which retrieval backends run and in which
//!   fallback order.
//! - [`CitationPolicy`] decides whether drafted claims must cite evidence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from policy parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),
}

/// Which retrieval backends run, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalPolicy {
    /// Vector backend only
    VectorOnly,

    /// Web backend only
    WebOnly,

    /// Both backends, unconditionally
    VectorAndWeb,

    /// Vector first; web only when vector returns nothing
    VectorThenWeb,

    /// Web first; vector only when web returns nothing
    WebThenVector,
}

impl RetrievalPolicy {
    pub const ALL: [RetrievalPolicy; 5] = [
        RetrievalPolicy::VectorOnly,
        RetrievalPolicy::WebOnly,
        RetrievalPolicy::VectorAndWeb,
        RetrievalPolicy::VectorThenWeb,
        RetrievalPolicy::WebThenVector,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalPolicy::VectorOnly => "VECTOR_ONLY",
            RetrievalPolicy::WebOnly => "WEB_ONLY",
            RetrievalPolicy::VectorAndWeb => "VECTOR_AND_WEB",
            RetrievalPolicy::VectorThenWeb => "VECTOR_THEN_WEB",
            RetrievalPolicy::WebThenVector => "WEB_THEN_VECTOR",
        }
    }
}

impl fmt::Display for RetrievalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| PolicyError::InvalidPolicy(s.to_string()))
    }
}

/// Whether a section's claims must be backed by citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CitationPolicy {
    LlmOnly,
    VectorOnly,
    WebOnly,
    VectorLlm,
    WebLlm,
    VectorWeb,
    All,
    SynthesisOnly,
}

impl CitationPolicy {
    pub const ALL: [CitationPolicy; 8] = [
        CitationPolicy::LlmOnly,
        CitationPolicy::VectorOnly,
        CitationPolicy::WebOnly,
        CitationPolicy::VectorLlm,
        CitationPolicy::WebLlm,
        CitationPolicy::VectorWeb,
        CitationPolicy::All,
        CitationPolicy::SynthesisOnly,
    ];

    /// True for every policy that draws on retrieved evidence.
    ///
    /// `LLM_ONLY` and `SYNTHESIS_ONLY` are the two policies under which
    /// claims must carry no evidence at all.
    pub fn requires_citations(&self) -> bool {
        !matches!(self, CitationPolicy::LlmOnly | CitationPolicy::SynthesisOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CitationPolicy::LlmOnly => "LLM_ONLY",
            CitationPolicy::VectorOnly => "VECTOR_ONLY",
            CitationPolicy::WebOnly => "WEB_ONLY",
            CitationPolicy::VectorLlm => "VECTOR_LLM",
            CitationPolicy::WebLlm => "WEB_LLM",
            CitationPolicy::VectorWeb => "VECTOR_WEB",
            CitationPolicy::All => "ALL",
            CitationPolicy::SynthesisOnly => "SYNTHESIS_ONLY",
        }
    }
}

impl fmt::Display for CitationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CitationPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| PolicyError::InvalidPolicy(s.to_string()))
    }
}
