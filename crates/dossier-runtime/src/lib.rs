//! # dossier-runtime
//!
//! Policy-driven evidence retrieval for Dossier.
//!
//! This crate owns the parts of the pipeline that talk to backends:
//! - [`RetrievalRouter`] dispatches a query to the vector and/or web
//!   retriever according to a [`RetrievalPolicy`]
//! - [`RetrievalCache`] memoizes whole retrieval results per
//!   (policy, query, filters, limit)
//! - [`RetrievalMetrics`] counts real backend work and cache effectiveness
//!
//! ## Important
//!
//! Backends are injected. The crate ships a pgvector SQL adapter over a
//! caller-supplied [`SqlExecutor`], an in-memory vector index and a web
//! adapter over a caller-supplied [`WebSearchProvider`]; it never opens a
//! connection itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dossier_runtime::{RetrievalRouter, RetrievalPolicy, WebRetriever};
//!
//! let router = RetrievalRouter::builder()
//!     .vector(Arc::new(index))
//!     .web(WebRetriever::new(Arc::new(search_provider)))
//!     .build();
//!
//! let bundle = router.retrieve(RetrievalPolicy::VectorThenWeb, "market size", Some(&embedding), None, 5)?;
//! println!("{} items, {} cache hits", bundle.len(), router.metrics().snapshot().cache_hits);
//! ```

pub mod cache;
pub mod metrics;
pub mod retrievers;
pub mod router;

pub use cache::{CacheKey, RetrievalCache};
pub use metrics::{MetricsSnapshot, RetrievalMetrics};
pub use retrievers::{
    Document, InMemoryVectorIndex, PgVectorConfig, PgVectorRetriever, SqlExecutor, SqlParam,
    VectorRetriever, WebRetriever, WebSearchProvider,
};
pub use router::{RetrievalRouter, RetrievalRouterBuilder};

// Re-export the policy so callers need only this crate for retrieval
pub use dossier_core::{EvidenceBundle, EvidenceItem, RetrievalFilters, RetrievalPolicy};

use dossier_core::{EvidenceError, PolicyError};
use thiserror::Error;

/// Errors from retrieval.
///
/// `Clone` so that a failure observed inside the cache's shared loader can
/// be handed to every waiting caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("{backend} retriever not configured")]
    RetrieverNotConfigured { backend: &'static str },

    #[error("Query embedding is required for vector retrieval")]
    MissingEmbedding,

    #[error("Backend call failed: {0}")]
    Backend(String),

    #[error("Evidence error: {0}")]
    Evidence(#[from] EvidenceError),
}

impl RetrievalError {
    /// Stable identifier for logs and API responses.
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::InvalidPolicy(_) => "INVALID_POLICY",
            RetrievalError::RetrieverNotConfigured { .. } => "RETRIEVER_NOT_CONFIGURED",
            RetrievalError::MissingEmbedding => "MISSING_EMBEDDING",
            RetrievalError::Backend(_) => "BACKEND_FAILURE",
            RetrievalError::Evidence(_) => "DUPLICATE_EVIDENCE",
        }
    }
}

impl From<PolicyError> for RetrievalError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidPolicy(name) => RetrievalError::InvalidPolicy(name),
        }
    }
}
