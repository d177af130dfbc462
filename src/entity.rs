//! Trait for values the catalog stores in the cache.

use crate::error::{Error, Result};
use crate::model::{CachedPage, Product};
use serde::{de::DeserializeOwned, Serialize};

/// A value that can be stored verbatim in the cache.
///
/// The cached format is plain JSON so any consumer of the cache (another
/// service, `redis-cli`) can read entries without a custom codec.
///
/// # Example
///
/// ```
/// use catalog_cache::entity::CacheEntity;
/// use catalog_cache::model::{Price, Product};
///
/// let product = Product {
///     id: 1,
///     name: "Lamp".to_string(),
///     description: "Desk lamp".to_string(),
///     category: "Category 1".to_string(),
///     price: Price::from_units(25),
/// };
///
/// let bytes = product.serialize_for_cache().unwrap();
/// assert_eq!(Product::deserialize_from_cache(&bytes).unwrap(), product);
/// ```
pub trait CacheEntity: Serialize + DeserializeOwned + Send + Sync {
    /// Short type label used in logs and metrics.
    fn cache_label() -> &'static str;

    /// Serialize for cache storage (JSON bytes).
    fn serialize_for_cache(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Deserialize from cache storage and run [`CacheEntity::validate`].
    ///
    /// # Errors
    ///
    /// - `Error::DeserializationError`: bytes are not valid JSON for `Self`
    /// - `Error::ValidationError`: decoded value is inconsistent
    fn deserialize_from_cache(bytes: &[u8]) -> Result<Self> {
        let value: Self = serde_json::from_slice(bytes)
            .map_err(|e| Error::DeserializationError(e.to_string()))?;
        value.validate()?;
        Ok(value)
    }

    /// Optional: Validate value after deserialization.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl CacheEntity for Product {
    fn cache_label() -> &'static str {
        "product"
    }
}

impl CacheEntity for CachedPage {
    fn cache_label() -> &'static str {
        "page"
    }

    fn validate(&self) -> Result<()> {
        if self.data.len() > self.page_size as usize {
            return Err(Error::ValidationError(format!(
                "cached page holds {} rows for page size {}",
                self.data.len(),
                self.page_size
            )));
        }
        Ok(())
    }
}

impl CacheEntity for Vec<Product> {
    fn cache_label() -> &'static str {
        "listing"
    }
}
