//! Validated, normalized list-query parameters.

use crate::error::{Error, Result};
use crate::model::Price;
use serde::Deserialize;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Page sizes above this are clamped, whatever the caller sent.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw list query as it arrives from the caller (query-string shape).
///
/// Nothing here is trusted; turn it into [`QueryParameters`] with
/// [`QueryParameters::from_query`] before use.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// List-query parameters after clamping and normalization.
///
/// Two requests that differ only in absent vs. empty optional strings (or
/// surrounding whitespace) build equal values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryParameters {
    page_number: u32,
    page_size: u32,
    min_price: Option<Price>,
    max_price: Option<Price>,
    category: Option<String>,
    search: Option<String>,
}

impl Default for QueryParameters {
    fn default() -> Self {
        QueryParameters {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            min_price: None,
            max_price: None,
            category: None,
            search: None,
        }
    }
}

impl QueryParameters {
    /// Validate and normalize a raw query.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` if the page number or page size is below 1, or
    /// if `minPrice` exceeds `maxPrice`.
    pub fn from_query(query: ProductQuery) -> Result<Self> {
        let page_number = match query.page_number {
            None => DEFAULT_PAGE_NUMBER,
            Some(n) if n < 1 => {
                return Err(Error::ValidationError(format!(
                    "pageNumber must be at least 1, got {}",
                    n
                )))
            }
            Some(n) => u32::try_from(n).map_err(|_| {
                Error::ValidationError(format!("pageNumber out of range: {}", n))
            })?,
        };

        let page_size = match query.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(n) if n < 1 => {
                return Err(Error::ValidationError(format!(
                    "pageSize must be at least 1, got {}",
                    n
                )))
            }
            Some(n) => n.min(MAX_PAGE_SIZE as i64) as u32,
        };

        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(Error::ValidationError(format!(
                    "minPrice {} exceeds maxPrice {}",
                    min, max
                )));
            }
        }

        Ok(QueryParameters {
            page_number,
            page_size,
            min_price: query.min_price,
            max_price: query.max_price,
            category: normalize(query.category),
            search: normalize(query.search),
        })
    }

    /// Start building parameters in code, page 1 of size 10.
    pub fn builder() -> QueryParametersBuilder {
        QueryParametersBuilder::default()
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn min_price(&self) -> Option<Price> {
        self.min_price
    }

    pub fn max_price(&self) -> Option<Price> {
        self.max_price
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Rows to skip: `(page_number - 1) * page_size`.
    pub fn skip(&self) -> u64 {
        (self.page_number as u64 - 1) * self.page_size as u64
    }

    /// Rows to return.
    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }

    /// True when no filter is applied (plain paging over the whole catalog).
    pub fn is_unfiltered(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.category.is_none()
            && self.search.is_none()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builder over [`ProductQuery`]; `build` runs the same validation.
#[derive(Clone, Debug, Default)]
pub struct QueryParametersBuilder {
    query: ProductQuery,
}

impl QueryParametersBuilder {
    pub fn page(mut self, number: i64, size: i64) -> Self {
        self.query.page_number = Some(number);
        self.query.page_size = Some(size);
        self
    }

    pub fn min_price(mut self, price: Price) -> Self {
        self.query.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Price) -> Self {
        self.query.max_price = Some(price);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.query.category = Some(category.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.query.search = Some(search.into());
        self
    }

    /// # Errors
    ///
    /// See [`QueryParameters::from_query`].
    pub fn build(self) -> Result<QueryParameters> {
        QueryParameters::from_query(self.query)
    }
}
