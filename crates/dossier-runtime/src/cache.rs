//! Caching layer for retrieval results.
//!
//! Memoizes whole evidence bundles by (policy, query, filters, limit).
//! Entries never expire and there is no size bound: the cache lives as
//! long as the router that owns it. Callers always receive their own copy
//! of a bundle, never a view into cached state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dossier_core::{EvidenceBundle, RetrievalFilters, RetrievalPolicy};
use moka::sync::Cache;

use crate::RetrievalError;

/// Cache key for retrieval results.
///
/// Filters are stored in canonical form, so two filter values that differ
/// only in mapping or sequence order produce equal keys. The query
/// embedding is not part of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    policy: RetrievalPolicy,
    query: String,
    filters: String,
    limit: usize,
}

impl CacheKey {
    pub fn new(
        policy: RetrievalPolicy,
        query: &str,
        filters: Option<&RetrievalFilters>,
        limit: usize,
    ) -> Self {
        Self {
            policy,
            query: query.to_string(),
            filters: filters.map(RetrievalFilters::canonical_key).unwrap_or_else(|| {
                RetrievalFilters::default().canonical_key()
            }),
            limit,
        }
    }

    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }
}

/// Retrieval cache using moka.
///
/// Concurrent misses on the same key are coalesced: one caller runs the
/// loader, the others wait for its result.
pub struct RetrievalCache {
    cache: Cache<CacheKey, EvidenceBundle>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RetrievalCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached bundle for the key, or run `loader` and cache its
    /// result. The flag is `true` on a hit.
    ///
    /// A failed load is not cached and counts as a miss.
    pub fn get_or_set<F>(
        &self,
        policy: RetrievalPolicy,
        query: &str,
        filters: Option<&RetrievalFilters>,
        limit: usize,
        loader: F,
    ) -> Result<(EvidenceBundle, bool), RetrievalError>
    where
        F: FnOnce() -> Result<EvidenceBundle, RetrievalError>,
    {
        let key = CacheKey::new(policy, query, filters, limit);

        match self.cache.entry(key).or_try_insert_with(loader) {
            Ok(entry) => {
                let hit = !entry.is_fresh();
                if hit {
                    self.hits.fetch_add(1, Ordering::SeqCst);
                } else {
                    self.misses.fetch_add(1, Ordering::SeqCst);
                }
                Ok((entry.into_value(), hit))
            }
            Err(err) => {
                self.misses.fetch_add(1, Ordering::SeqCst);
                Err(Arc::try_unwrap(err).unwrap_or_else(|shared| (*shared).clone()))
            }
        }
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
        self.hits.store(0, Ordering::SeqCst);
        self.misses.store(0, Ordering::SeqCst);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    /// Number of cached bundles.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for RetrievalCache {
    fn default() -> Self {
        Self::new()
    }
}
