//! Runtime configuration loaded from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `DATABASE_URL` | unset | primary store connection string |
//! | `REPLICA_DATABASE_URL` | unset | read replica; reads use the primary when unset |
//! | `DATABASE_POOL_SIZE` | 10 | connections per store pool |
//! | `REDIS_URL` | unset | `redis://` URL of the shared cache |
//! | `REDIS_POOL_SIZE` | 16 | Redis connection pool size |
//! | `CACHE_TIMEOUT_MS` | 50 | bound on a single cache call |
//! | `CACHE_INVALIDATE_TIMEOUT_MS` | 2000 | bound on dropping all list pages after a write |
//! | `LIST_TTL_SECS` | 30 | filtered list pages |
//! | `LISTING_TTL_SECS` | 300 | unfiltered pages and the full listing |
//! | `ITEM_TTL_SECS` | 300 | single products |
//! | `STORE_DEADLINE_MS` | 5000 | bound on store calls, `0` disables it |

use crate::cache::{DEFAULT_CACHE_TIMEOUT, DEFAULT_INVALIDATE_TIMEOUT};
use crate::error::{Error, Result};
use crate::observability::TtlPolicy;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_POOL_SIZE: u32 = 10;
pub const DEFAULT_REDIS_POOL_SIZE: u32 = 16;
pub const DEFAULT_STORE_DEADLINE: Duration = Duration::from_secs(5);

/// Catalog service configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub database_url: Option<String>,
    pub replica_database_url: Option<String>,
    pub database_pool_size: u32,
    pub redis_url: Option<String>,
    pub redis_pool_size: u32,
    pub cache_timeout: Duration,
    pub invalidate_timeout: Duration,
    pub ttl: TtlPolicy,
    /// `None` leaves store calls unbounded.
    pub store_deadline: Option<Duration>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            database_url: None,
            replica_database_url: None,
            database_pool_size: DEFAULT_DATABASE_POOL_SIZE,
            redis_url: None,
            redis_pool_size: DEFAULT_REDIS_POOL_SIZE,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            invalidate_timeout: DEFAULT_INVALIDATE_TIMEOUT,
            ttl: TtlPolicy::default(),
            store_deadline: Some(DEFAULT_STORE_DEADLINE),
        }
    }
}

impl CatalogConfig {
    /// Load from the process environment, then validate.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if a variable does not parse or the result fails
    /// [`CatalogConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = CatalogConfig::default();
        let text = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |name: &str| -> Result<Option<u64>> { parse_var(name, text(name)) };

        let store_deadline = match number("STORE_DEADLINE_MS")? {
            None => defaults.store_deadline,
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        };

        let config = CatalogConfig {
            database_url: text("DATABASE_URL"),
            replica_database_url: text("REPLICA_DATABASE_URL"),
            database_pool_size: parse_var("DATABASE_POOL_SIZE", text("DATABASE_POOL_SIZE"))?
                .unwrap_or(defaults.database_pool_size),
            redis_url: text("REDIS_URL"),
            redis_pool_size: parse_var("REDIS_POOL_SIZE", text("REDIS_POOL_SIZE"))?
                .unwrap_or(defaults.redis_pool_size),
            cache_timeout: number("CACHE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_timeout),
            invalidate_timeout: number("CACHE_INVALIDATE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.invalidate_timeout),
            ttl: TtlPolicy {
                filtered: number("LIST_TTL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.ttl.filtered),
                listing: number("LISTING_TTL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.ttl.listing),
                item: number("ITEM_TTL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.ttl.item),
            },
            store_deadline,
        };

        config.validate()?;
        debug!("Loaded catalog config: {:?}", config.redacted());
        Ok(config)
    }

    /// Check invariants the rest of the crate relies on.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.replica_database_url.is_some() && self.database_url.is_none() {
            return Err(Error::ConfigError(
                "REPLICA_DATABASE_URL is set but DATABASE_URL is not".to_string(),
            ));
        }
        if self.database_pool_size == 0 {
            return Err(Error::ConfigError("DATABASE_POOL_SIZE must be > 0".to_string()));
        }
        if self.redis_pool_size == 0 {
            return Err(Error::ConfigError("REDIS_POOL_SIZE must be > 0".to_string()));
        }
        if self.cache_timeout.is_zero() {
            return Err(Error::ConfigError("CACHE_TIMEOUT_MS must be > 0".to_string()));
        }
        if self.invalidate_timeout < self.cache_timeout {
            return Err(Error::ConfigError(
                "CACHE_INVALIDATE_TIMEOUT_MS must be >= CACHE_TIMEOUT_MS".to_string(),
            ));
        }
        for (name, ttl) in [
            ("LIST_TTL_SECS", self.ttl.filtered),
            ("LISTING_TTL_SECS", self.ttl.listing),
            ("ITEM_TTL_SECS", self.ttl.item),
        ] {
            if ttl.is_zero() {
                return Err(Error::ConfigError(format!("{} must be > 0", name)));
            }
        }
        Ok(())
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        self.ttl.clone()
    }

    /// Copy with connection strings masked, for logging.
    fn redacted(&self) -> CatalogConfig {
        let mask = |url: &Option<String>| url.as_ref().map(|_| "***".to_string());
        CatalogConfig {
            database_url: mask(&self.database_url),
            replica_database_url: mask(&self.replica_database_url),
            redis_url: mask(&self.redis_url),
            ..self.clone()
        }
    }

    /// Redis backend for `REDIS_URL`.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if `REDIS_URL` is unset or the pool cannot be built.
    #[cfg(feature = "redis")]
    pub fn redis_backend(&self) -> Result<crate::backend::RedisBackend> {
        let url = self
            .redis_url
            .as_deref()
            .ok_or_else(|| Error::ConfigError("REDIS_URL is not set".to_string()))?;
        crate::backend::RedisBackend::from_connection_string(url, self.redis_pool_size)
    }

    /// Primary (and replica, if configured) Postgres stores, connected lazily.
    ///
    /// # Errors
    ///
    /// `Error::ConfigError` if `DATABASE_URL` is unset or a URL is invalid.
    #[cfg(feature = "postgres")]
    pub fn postgres_router(
        &self,
    ) -> Result<crate::router::StoreRouter<crate::postgres::PgProductStore>> {
        use crate::postgres::PgProductStore;
        use crate::router::StoreRouter;

        let primary_url = self
            .database_url
            .as_deref()
            .ok_or_else(|| Error::ConfigError("DATABASE_URL is not set".to_string()))?;
        let mut router =
            StoreRouter::new(PgProductStore::connect_lazy(primary_url, self.database_pool_size)?);
        if let Some(replica_url) = self.replica_database_url.as_deref() {
            router = router.with_replica(PgProductStore::connect_lazy(
                replica_url,
                self.database_pool_size,
            )?);
        }
        Ok(router)
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| Error::ConfigError(format!("{}={:?}: {}", name, v, e)))
        })
        .transpose()
}
