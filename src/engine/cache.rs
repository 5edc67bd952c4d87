//! Outcome caching for the reconciler.
//!
//! An in-memory TTL cache keyed by the full call arguments
//! `(location, start, end)`. Entries are never shared between locations
//! or ranges. The cache is owned by the caller and wrapped around a
//! `HistoryReconciler`; the reconciler itself holds no state.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use super::reconciler::HistoryReconciler;
use crate::types::{Location, Provenance, ReconciliationOutcome};

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Cache key: the reconcile arguments exactly as the caller passed them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    /// Name and coordinates, so two places with the same name never collide.
    pub location: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HistoryKey {
    pub fn new(location: &Location, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            location: location.to_string(),
            start,
            end,
        }
    }
}

struct CacheEntry {
    outcome: ReconciliationOutcome,
    inserted_at: DateTime<Utc>,
}

/// Simple in-memory TTL cache for reconciliation outcomes.
pub struct OutcomeCache {
    entries: HashMap<HistoryKey, CacheEntry>,
    ttl: Duration,
}

impl OutcomeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &HistoryKey) -> Option<&ReconciliationOutcome> {
        self.entries.get(key).and_then(|entry| {
            if Utc::now() - entry.inserted_at < self.ttl {
                Some(&entry.outcome)
            } else {
                None
            }
        })
    }

    pub fn insert(&mut self, key: HistoryKey, outcome: ReconciliationOutcome) {
        self.entries.insert(
            key,
            CacheEntry {
                outcome,
                inserted_at: Utc::now(),
            },
        );
    }

    /// Remove expired entries.
    pub fn evict_expired(&mut self) {
        let now = Utc::now();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.inserted_at < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cached reconciler
// ---------------------------------------------------------------------------

/// A `HistoryReconciler` with an optional outcome cache in front of it.
///
/// Outcomes where every upstream request failed (`Provenance::None`) are
/// not cached, so the next request retries.
pub struct CachedReconciler {
    inner: HistoryReconciler,
    cache: Option<Mutex<OutcomeCache>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedReconciler {
    pub fn new(inner: HistoryReconciler, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Some(Mutex::new(OutcomeCache::new(ttl))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Pass every call straight through.
    pub fn uncached(inner: HistoryReconciler) -> Self {
        Self {
            inner,
            cache: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn reconcile(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> ReconciliationOutcome {
        let key = HistoryKey::new(location, start, end);

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock().await;
            cache.evict_expired();
            if let Some(hit) = cache.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(city = %location.name, %start, %end, "History cache hit");
                return hit.clone();
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let outcome = self.inner.reconcile(location, start, end, today).await;

        if let Some(cache) = &self.cache {
            if outcome.provenance != Provenance::None {
                cache.lock().await.insert(key, outcome.clone());
            }
        }
        outcome
    }

    // -- Accessors for monitoring ----------------------------------------

    pub fn cache_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Calls that reached the upstream sources.
    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Cache hit rate as a fraction (0.0 to 1.0).
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.cache_hits();
        let total = hits + self.cache_misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
