//! Retrieval router: policy-driven dispatch to the vector and web backends.
//!
//! | Policy | Vector call | Web call |
//! |--------|-------------|----------|
//! | `VECTOR_ONLY` | always | never |
//! | `WEB_ONLY` | never | always |
//! | `VECTOR_AND_WEB` | always | always |
//! | `VECTOR_THEN_WEB` | always | only if vector returned nothing |
//! | `WEB_THEN_VECTOR` | only if web returned nothing | always, first |
//!
//! Calling a backend that was not configured is an error, never a silent
//! empty result. Every request goes through the cache; backend counters
//! move only when a backend actually runs.

use std::sync::Arc;

use dossier_core::{EvidenceBundle, EvidenceItem, RetrievalFilters, RetrievalPolicy};

use crate::cache::RetrievalCache;
use crate::metrics::RetrievalMetrics;
use crate::retrievers::{VectorRetriever, WebRetriever};
use crate::RetrievalError;

/// Dispatches retrieval requests according to a [`RetrievalPolicy`].
pub struct RetrievalRouter {
    vector: Option<Arc<dyn VectorRetriever>>,
    web: Option<WebRetriever>,
    cache: Arc<RetrievalCache>,
    metrics: Arc<RetrievalMetrics>,
}

impl RetrievalRouter {
    pub fn builder() -> RetrievalRouterBuilder {
        RetrievalRouterBuilder::new()
    }

    pub fn cache(&self) -> &RetrievalCache {
        &self.cache
    }

    pub fn metrics(&self) -> &RetrievalMetrics {
        &self.metrics
    }

    /// Retrieve evidence for `query` under `policy`.
    pub fn retrieve(
        &self,
        policy: RetrievalPolicy,
        query: &str,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<EvidenceBundle, RetrievalError> {
        self.metrics.record_policy(policy);

        let result = self.cache.get_or_set(policy, query, filters, limit, || {
            self.dispatch(policy, query, embedding, filters, limit)
        });

        // A failed load is a miss in the cache's own counters too.
        let (bundle, hit) = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                self.metrics.record_cache_hit(false);
                return Err(err);
            }
        };
        self.metrics.record_cache_hit(hit);

        tracing::debug!(
            policy = %policy,
            hit,
            vector = bundle.vector().count(),
            web = bundle.web().count(),
            "Retrieval complete"
        );

        Ok(bundle)
    }

    /// Like [`retrieve`](Self::retrieve), with the policy given by name.
    pub fn retrieve_named(
        &self,
        policy: &str,
        query: &str,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<EvidenceBundle, RetrievalError> {
        let policy: RetrievalPolicy = policy.parse().map_err(|err| {
            tracing::warn!(policy, "Unknown retrieval policy");
            RetrievalError::from(err)
        })?;
        self.retrieve(policy, query, embedding, filters, limit)
    }

    fn dispatch(
        &self,
        policy: RetrievalPolicy,
        query: &str,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<EvidenceBundle, RetrievalError> {
        let vector = || self.call_vector(embedding, filters, limit);
        let web = || self.call_web(query, filters, limit);

        let (vector_items, web_items) = match policy {
            RetrievalPolicy::VectorOnly => (vector()?, Vec::new()),
            RetrievalPolicy::WebOnly => (Vec::new(), web()?),
            RetrievalPolicy::VectorAndWeb => (vector()?, web()?),
            RetrievalPolicy::VectorThenWeb => {
                let vector_items = vector()?;
                if vector_items.is_empty() {
                    (vector_items, web()?)
                } else {
                    (vector_items, Vec::new())
                }
            }
            RetrievalPolicy::WebThenVector => {
                let web_items = web()?;
                if web_items.is_empty() {
                    (vector()?, web_items)
                } else {
                    (Vec::new(), web_items)
                }
            }
        };

        Ok(EvidenceBundle::from_partitions(policy, vector_items, web_items)?)
    }

    fn call_vector(
        &self,
        embedding: Option<&[f32]>,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError> {
        let retriever = self.vector.as_ref().ok_or_else(|| {
            tracing::warn!("Vector retriever requested but not configured");
            RetrievalError::RetrieverNotConfigured { backend: "vector" }
        })?;

        let items = retriever.retrieve(embedding, filters, limit)?;
        self.metrics.record_vector_request();
        tracing::debug!(backend = retriever.name(), items = items.len(), "Vector call");
        Ok(items)
    }

    fn call_web(
        &self,
        query: &str,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Result<Vec<EvidenceItem>, RetrievalError> {
        let retriever = self.web.as_ref().ok_or_else(|| {
            tracing::warn!("Web retriever requested but not configured");
            RetrievalError::RetrieverNotConfigured { backend: "web" }
        })?;

        let items = retriever.retrieve(query, filters, limit)?;
        self.metrics.record_web_request();
        tracing::debug!(backend = retriever.provider_name(), items = items.len(), "Web call");
        Ok(items)
    }
}

/// Builder for RetrievalRouter.
///
/// Cache and metrics default to fresh instances; pass shared ones to pool
/// them across routers.
pub struct RetrievalRouterBuilder {
    vector: Option<Arc<dyn VectorRetriever>>,
    web: Option<WebRetriever>,
    cache: Option<Arc<RetrievalCache>>,
    metrics: Option<Arc<RetrievalMetrics>>,
}

impl RetrievalRouterBuilder {
    pub fn new() -> Self {
        Self {
            vector: None,
            web: None,
            cache: None,
            metrics: None,
        }
    }

    /// Set the vector backend.
    pub fn vector(mut self, retriever: Arc<dyn VectorRetriever>) -> Self {
        self.vector = Some(retriever);
        self
    }

    /// Set the web backend.
    pub fn web(mut self, retriever: WebRetriever) -> Self {
        self.web = Some(retriever);
        self
    }

    pub fn cache(mut self, cache: Arc<RetrievalCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn metrics(mut self, metrics: Arc<RetrievalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the router. Missing backends surface per request, not here.
    pub fn build(self) -> RetrievalRouter {
        RetrievalRouter {
            vector: self.vector,
            web: self.web,
            cache: self.cache.unwrap_or_default(),
            metrics: self.metrics.unwrap_or_default(),
        }
    }
}

impl Default for RetrievalRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
