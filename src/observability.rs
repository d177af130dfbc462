//! Metrics hooks and TTL policy for cached catalog reads.
//!
//! # Metrics
//!
//! [`crate::cache::CacheStore`] reports every lookup, write, delete and absorbed
//! fault through [`CacheMetrics`]. The default is [`NoOpMetrics`];
//! [`CountingMetrics`] keeps atomic counters and is enough for dashboards fed
//! by polling, or for tests that need to tell a hit from a miss.
//!
//! # TTL policy
//!
//! ```
//! use catalog_cache::observability::TtlPolicy;
//! use catalog_cache::params::QueryParameters;
//! use std::time::Duration;
//!
//! let policy = TtlPolicy::default();
//! assert_eq!(policy.for_page(&QueryParameters::default()), Duration::from_secs(300));
//!
//! let filtered = QueryParameters::builder().category("Category 1").build().unwrap();
//! assert_eq!(policy.for_page(&filtered), Duration::from_secs(30));
//! ```
//!
//! Filtered result space is much larger than the plain listing and is
//! written to more often per distinct key, so it gets the shorter TTL.

use crate::params::QueryParameters;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss (absent, expired, undecodable, or backend fault).
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache set operation.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a delete; `count` is the number of keys removed.
    fn record_delete(&self, key: &str, count: u64) {
        debug!("Cache DELETE: {} ({} keys)", key, count);
    }

    /// Record an absorbed backend error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _count: u64) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Lock-free counters over the metric events.
#[derive(Default)]
pub struct CountingMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CountingMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for CountingMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, _key: &str, _duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_set(&self, _key: &str, _duration: Duration) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delete(&self, _key: &str, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    fn record_error(&self, key: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

impl<M: CacheMetrics + ?Sized> CacheMetrics for std::sync::Arc<M> {
    fn record_hit(&self, key: &str, duration: Duration) {
        (**self).record_hit(key, duration)
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        (**self).record_miss(key, duration)
    }

    fn record_set(&self, key: &str, duration: Duration) {
        (**self).record_set(key, duration)
    }

    fn record_delete(&self, key: &str, count: u64) {
        (**self).record_delete(key, count)
    }

    fn record_error(&self, key: &str, error: &str) {
        (**self).record_error(key, error)
    }
}

/// TTLs per kind of cached read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Filtered or searched list pages.
    pub filtered: Duration,
    /// Unfiltered list pages and the full listing.
    pub listing: Duration,
    /// Single products.
    pub item: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy {
            filtered: Duration::from_secs(30),
            listing: Duration::from_secs(300),
            item: Duration::from_secs(300),
        }
    }
}

impl TtlPolicy {
    /// TTL for a list page with these parameters.
    pub fn for_page(&self, params: &QueryParameters) -> Duration {
        if params.is_unfiltered() {
            self.listing
        } else {
            self.filtered
        }
    }
}
