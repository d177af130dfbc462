//! Cache key derivation.
//!
//! List keys have the form
//!
//! ```text
//! products:list:pg=<n>:sz=<n>[:min=<price>][:max=<price>][:cat=<text>][:q=<text>]
//! ```
//!
//! Segments always appear in this order and absent filters are left out.
//! Text values are form-urlencoded, so a `:` or `=` inside a search term can
//! never be read as a segment boundary.

use crate::params::QueryParameters;
use url::form_urlencoded;

/// Namespace shared by every paginated list key; invalidated as a whole.
pub const LIST_PREFIX: &str = "products:list:";

/// Well-known key of the unpaginated full listing.
pub const ALL_PRODUCTS_KEY: &str = "products:all";

/// Prefix of single-product keys.
pub const PRODUCT_PREFIX: &str = "product";

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build the list key for a set of query parameters.
    pub fn list(params: &QueryParameters) -> String {
        let mut key = format!(
            "{}pg={}:sz={}",
            LIST_PREFIX,
            params.page_number(),
            params.page_size()
        );
        if let Some(min) = params.min_price() {
            key.push_str(&format!(":min={}", min));
        }
        if let Some(max) = params.max_price() {
            key.push_str(&format!(":max={}", max));
        }
        if let Some(category) = params.category() {
            key.push_str(":cat=");
            key.push_str(&escape(category));
        }
        if let Some(search) = params.search() {
            key.push_str(":q=");
            key.push_str(&escape(search));
        }
        key
    }

    /// Build the key of a single product.
    pub fn product(id: i64) -> String {
        format!("{}:{}", PRODUCT_PREFIX, id)
    }
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
