//! Retrieval counters.
//!
//! Backend counters reflect real backend work: a request answered from
//! the cache increments `cache_hits`, never `vector_requests` or
//! `web_requests`.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dossier_core::RetrievalPolicy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Thread-safe retrieval counters.
#[derive(Debug, Default)]
pub struct RetrievalMetrics {
    vector_requests: AtomicU64,
    web_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    policy_counts: RwLock<HashMap<RetrievalPolicy, u64>>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub vector_requests: u64,
    pub web_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,

    /// Requests per routing policy, keyed by policy name
    pub policy_counts: BTreeMap<String, u64>,

    pub captured_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Share of requests served from the cache, 0.0 before any request.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl RetrievalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_policy(&self, policy: RetrievalPolicy) {
        *self.policy_counts.write().entry(policy).or_insert(0) += 1;
    }

    pub fn record_vector_request(&self) {
        self.vector_requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_web_request(&self) {
        self.web_requests.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_cache_hit(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::SeqCst);
        } else {
            self.cache_misses.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn vector_requests(&self) -> u64 {
        self.vector_requests.load(Ordering::SeqCst)
    }

    pub fn web_requests(&self) -> u64 {
        self.web_requests.load(Ordering::SeqCst)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::SeqCst)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::SeqCst)
    }

    pub fn policy_count(&self, policy: RetrievalPolicy) -> u64 {
        self.policy_counts.read().get(&policy).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let policy_counts = self
            .policy_counts
            .read()
            .iter()
            .map(|(policy, count)| (policy.to_string(), *count))
            .collect();

        MetricsSnapshot {
            vector_requests: self.vector_requests(),
            web_requests: self.web_requests(),
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            policy_counts,
            captured_at: Utc::now(),
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.vector_requests.store(0, Ordering::SeqCst);
        self.web_requests.store(0, Ordering::SeqCst);
        self.cache_hits.store(0, Ordering::SeqCst);
        self.cache_misses.store(0, Ordering::SeqCst);
        self.policy_counts.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_and_snapshot() {
        let metrics = RetrievalMetrics::new();
        metrics.record_policy(RetrievalPolicy::VectorThenWeb);
        metrics.record_policy(RetrievalPolicy::VectorThenWeb);
        metrics.record_vector_request();
        metrics.record_cache_hit(false);
        metrics.record_cache_hit(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.vector_requests, 1);
        assert_eq!(snapshot.web_requests, 0);
        assert_eq!(snapshot.policy_counts["VECTOR_THEN_WEB"], 2);
        assert_eq!(snapshot.hit_rate(), 0.5);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["cache_misses"], 1);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(RetrievalMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record_web_request();
                        metrics.record_policy(RetrievalPolicy::WebOnly);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.web_requests(), 1000);
        assert_eq!(metrics.policy_count(RetrievalPolicy::WebOnly), 1000);
    }

    #[test]
    fn test_reset() {
        let metrics = RetrievalMetrics::new();
        metrics.record_web_request();
        metrics.record_policy(RetrievalPolicy::WebOnly);
        metrics.reset();
        assert_eq!(metrics.web_requests(), 0);
        assert!(metrics.snapshot().policy_counts.is_empty());
    }
}
