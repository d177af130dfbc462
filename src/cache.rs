//! Cache store adapter: the advisory face of a [`CacheBackend`].
//!
//! The cache never decides the outcome of a request. Every call here is
//! bounded by a short timeout, and any backend error or timeout is logged,
//! counted, and turned into "miss" (reads) or "nothing happened" (writes).

use crate::backend::CacheBackend;
use crate::entity::CacheEntity;
use crate::error::Error;
use crate::observability::{CacheMetrics, NoOpMetrics};
use std::future::Future;
use std::time::{Duration, Instant};

/// Default bound on a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(50);

/// Default bound on a prefix invalidation, which walks many keys.
pub const DEFAULT_INVALIDATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout-bounded, fault-absorbing wrapper over a cache backend.
pub struct CacheStore<B: CacheBackend> {
    backend: B,
    timeout: Duration,
    invalidate_timeout: Duration,
    metrics: Box<dyn CacheMetrics>,
}

impl<B: CacheBackend> CacheStore<B> {
    pub fn new(backend: B) -> Self {
        CacheStore {
            backend,
            timeout: DEFAULT_CACHE_TIMEOUT,
            invalidate_timeout: DEFAULT_INVALIDATE_TIMEOUT,
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the bound on prefix invalidation.
    ///
    /// Kept separate from the per-call timeout: a prefix walk on a large but
    /// healthy keyspace takes far longer than a single GET.
    pub fn with_invalidation_timeout(mut self, timeout: Duration) -> Self {
        self.invalidate_timeout = timeout;
        self
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run a backend call under the per-call timeout.
    async fn bounded<T>(
        &self,
        op: &str,
        key: &str,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        Self::within(self.timeout, op, key, fut).await
    }

    async fn within<T>(
        limit: Duration,
        op: &str,
        key: &str,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> crate::Result<T> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "cache {} {} exceeded {:?}",
                op, key, limit
            ))),
        }
    }

    /// Log and count a fault that the caller will never see.
    fn absorb(&self, op: &str, key: &str, e: &Error) {
        warn!("⚠ Cache {} failed for {}, continuing without cache: {}", op, key, e);
        self.metrics.record_error(key, &e.to_string());
    }

    /// Look up raw bytes. Backend faults and timeouts read as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let timer = Instant::now();
        match self.bounded("GET", key, self.backend.get(key)).await {
            Ok(Some(bytes)) => {
                self.metrics.record_hit(key, timer.elapsed());
                Some(bytes)
            }
            Ok(None) => {
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
            Err(e) => {
                self.absorb("GET", key, &e);
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
        }
    }

    /// Look up and decode a cached value.
    ///
    /// Undecodable bytes are logged and reported as a miss; the caller's
    /// recompute overwrites them.
    pub async fn get_entity<T: CacheEntity>(&self, key: &str) -> Option<T> {
        let timer = Instant::now();
        match self.bounded("GET", key, self.backend.get(key)).await {
            Ok(Some(bytes)) => match T::deserialize_from_cache(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit(key, timer.elapsed());
                    Some(value)
                }
                Err(e) => {
                    warn!(
                        "Discarding undecodable cached {} at {}: {}",
                        T::cache_label(),
                        key,
                        e
                    );
                    self.metrics.record_miss(key, timer.elapsed());
                    None
                }
            },
            Ok(None) => {
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
            Err(e) => {
                self.absorb("GET", key, &e);
                self.metrics.record_miss(key, timer.elapsed());
                None
            }
        }
    }

    /// Store raw bytes. Best effort: failures are logged, never returned.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let timer = Instant::now();
        match self
            .bounded("SET", key, self.backend.set(key, value, Some(ttl)))
            .await
        {
            Ok(()) => self.metrics.record_set(key, timer.elapsed()),
            Err(e) => self.absorb("SET", key, &e),
        }
    }

    /// Encode and store a value. Best effort.
    pub async fn set_entity<T: CacheEntity>(&self, key: &str, value: &T, ttl: Duration) {
        match value.serialize_for_cache() {
            Ok(bytes) => self.set(key, bytes, ttl).await,
            Err(e) => self.absorb("ENCODE", key, &e),
        }
    }

    /// Delete every key under `prefix`; returns the number removed (0 on fault).
    ///
    /// Bounded by the invalidation timeout, not the per-call one. Not atomic:
    /// keys written by concurrent readers after the scan survive until their
    /// TTL.
    pub async fn invalidate_prefix(&self, prefix: &str) -> u64 {
        let fut = self.backend.delete_prefix(prefix);
        match Self::within(self.invalidate_timeout, "DELETE_PREFIX", prefix, fut).await {
            Ok(count) => {
                self.metrics.record_delete(prefix, count);
                count
            }
            Err(e) => {
                self.absorb("DELETE_PREFIX", prefix, &e);
                0
            }
        }
    }

    /// Delete a single well-known key. Best effort.
    pub async fn invalidate_key(&self, key: &str) {
        match self.bounded("DELETE", key, self.backend.delete(key)).await {
            Ok(()) => self.metrics.record_delete(key, 1),
            Err(e) => self.absorb("DELETE", key, &e),
        }
    }

    /// Whether the backend answers within the timeout.
    pub async fn health_check(&self) -> bool {
        match self
            .bounded("PING", "-", self.backend.health_check())
            .await
        {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                false
            }
        }
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
