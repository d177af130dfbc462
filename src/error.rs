//! Error types for the catalog cache.

use std::fmt;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the catalog read/write path.
///
/// Cache faults (`CacheUnavailable`, and `Timeout` raised by a cache call) are
/// produced by backends but absorbed by [`crate::cache::CacheStore`]; they never
/// reach a caller of [`crate::service::CatalogService`]. Store faults propagate
/// as request failures.
#[derive(Debug, Clone)]
pub enum Error {
    /// Requested product id is absent from the store.
    ///
    /// User-visible as 404. Never retried.
    NotFound(String),

    /// Malformed or out-of-range request parameters.
    ///
    /// Raised when:
    /// - page number or page size is below 1
    /// - a price is negative or malformed (rejected while parsing)
    /// - `minPrice > maxPrice`
    /// - a product draft has an empty name
    ///
    /// Oversized page sizes are clamped, not rejected.
    ValidationError(String),

    /// Cache backend failed (connection lost, protocol error, pool exhausted).
    ///
    /// **Recovery:** the adapter treats the operation as a miss / no-op.
    CacheUnavailable(String),

    /// Relational store could not be reached.
    ///
    /// Fatal for writes and primary reads. On the replica this triggers a
    /// fail-over to the primary instead.
    StoreUnavailable(String),

    /// Relational store reached but the statement failed.
    StoreError(String),

    /// Operation exceeded its deadline.
    ///
    /// For cache calls this degrades to a miss. For store calls it fails the
    /// request and is never retried.
    Timeout(String),

    /// Serialization failed when converting a value to cache bytes.
    SerializationError(String),

    /// Cached bytes could not be decoded.
    ///
    /// **Recovery:** the entry is recomputed from the store and overwritten.
    DeserializationError(String),

    /// Invalid configuration (bad URL, zero TTL, missing variable).
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// HTTP status code a web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::ValidationError(_) => 400,
            Error::StoreUnavailable(_) | Error::CacheUnavailable(_) => 503,
            Error::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Whether the error means the target store could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::CacheUnavailable(msg) => write!(f, "Cache unavailable: {}", msg),
            Error::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::CacheUnavailable(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::CacheUnavailable(format!("Redis error: {}", e))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Error::StoreUnavailable(e.to_string()),
            _ => Error::StoreError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ValidationError("Test".to_string());
        assert_eq!(err.to_string(), "Validation error: Test");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound("product 1".into()).status_code(), 404);
        assert_eq!(Error::ValidationError("page".into()).status_code(), 400);
        assert_eq!(Error::StoreUnavailable("down".into()).status_code(), 503);
        assert_eq!(Error::Timeout("slow".into()).status_code(), 504);
        assert_eq!(Error::StoreError("syntax".into()).status_code(), 500);
    }

    #[test]
    fn test_json_syntax_error_is_deserialization() {
        let err: Error = serde_json::from_slice::<u32>(b"{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::DeserializationError(_)));
    }
}
