//! Web retriever: adapts raw search results into evidence items.

use std::sync::Arc;

use dossier_core::{parse_timestamp, EvidenceItem, EvidenceKind, RetrievalFilters};
use serde_json::{Map, Value};

use crate::RetrievalError;

/// A web search backend.
///
/// Results are raw JSON objects; [`WebRetriever`] maps the fields it knows
/// (`id`, `content`, `snippet`, `score`, `source`, `metadata`, `url`,
/// `published_at`) and ignores the rest.
pub trait WebSearchProvider: Send + Sync {
    /// Provider name, used for fallback ids and as the default source.
    fn name(&self) -> &str;

    fn search(
        &self,
        query: &str,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<Map<String, Value>>, RetrievalError>;
}

/// Wrapper around a configurable web search provider.
#[derive(Clone)]
pub struct WebRetriever {
    provider: Arc<dyn WebSearchProvider>,
}

impl WebRetriever {
    pub fn new(provider: Arc<dyn WebSearchProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retrieve(
        &self,
        query: &str,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError> {
        let results = self.provider.search(query, filters, limit)?;
        tracing::debug!(
            provider = self.provider.name(),
            results = results.len(),
            "Web search complete"
        );

        Ok(results
            .iter()
            .take(limit)
            .enumerate()
            .map(|(position, result)| self.item_from_result(position, result))
            .collect())
    }

    fn item_from_result(&self, position: usize, result: &Map<String, Value>) -> EvidenceItem {
        let name = self.provider.name();

        let id = match result.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Null) | None => format!("{}-{}", name, position),
            Some(other) => other.to_string(),
        };

        let content = result
            .get("content")
            .and_then(Value::as_str)
            .or_else(|| result.get("snippet").and_then(Value::as_str))
            .unwrap_or_default();

        let mut item = EvidenceItem::new(id, content)
            .with_score(result.get("score").and_then(Value::as_f64).unwrap_or(0.0))
            .with_source(result.get("source").and_then(Value::as_str).unwrap_or(name))
            .with_kind(EvidenceKind::Web);

        if let Some(Value::Object(metadata)) = result.get("metadata") {
            item.metadata = metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        }

        if let Some(url) = result.get("url").and_then(Value::as_str) {
            item = item.with_uri(url);
        }

        if let Some(published) = result
            .get("published_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
        {
            item = item.with_added_at(published);
        }

        item
    }
}
