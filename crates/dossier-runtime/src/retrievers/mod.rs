//! Retrieval backends.
//!
//! The router depends only on [`VectorRetriever`] and [`WebRetriever`];
//! concrete backends plug in behind them.

mod vector;
mod web;

pub use vector::{
    cosine_similarity, Document, InMemoryVectorIndex, PgVectorConfig, PgVectorRetriever,
    SqlExecutor, SqlParam,
};
pub use web::{WebRetriever, WebSearchProvider};

use dossier_core::{EvidenceItem, RetrievalFilters};

use crate::RetrievalError;

/// A similarity-search backend.
///
/// # Contract
/// - MUST fail with `MissingEmbedding` when no embedding is given
/// - MUST return at most `limit` items, ranked by descending score
/// - MUST tag items with `kind = vector`
pub trait VectorRetriever: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str {
        "vector"
    }

    fn retrieve(
        &self,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError>;
}
