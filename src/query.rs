//! Query executor: filter predicate, ordering, pagination and count.

use crate::error::Result;
use crate::model::{CachedPage, Price, Product};
use crate::params::QueryParameters;
use crate::repository::ProductStore;

/// Conjunction of the filters present in a list query.
///
/// Absent filters are not applied; an empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ProductFilter {
    pub fn from_params(params: &QueryParameters) -> Self {
        ProductFilter {
            min_price: params.min_price(),
            max_price: params.max_price(),
            category: params.category().map(str::to_string),
            search: params.search().map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.category.is_none()
            && self.search.is_none()
    }

    /// Evaluate the predicate against one row.
    ///
    /// Text search here is case-insensitive substring matching over name and
    /// description. It scans every row, so it only backs small stores; the
    /// Postgres store runs the same filter through its full-text index.
    pub fn matches(&self, product: &Product) -> bool {
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if let Some(category) = &self.category {
            if &product.category != category {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Runs a bounded, ordered, counted list query against one store.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute `params` against `store`.
    ///
    /// Rows come back ordered by id ascending, skipping
    /// `(page_number - 1) * page_size` and taking `page_size`. The total count
    /// is a separate count over the whole filtered set.
    ///
    /// # Errors
    ///
    /// Store errors propagate unchanged.
    pub async fn execute<S: ProductStore>(
        params: &QueryParameters,
        store: &S,
    ) -> Result<CachedPage> {
        let filter = ProductFilter::from_params(params);

        let (total_count, data) = futures::try_join!(
            store.count(&filter),
            store.fetch_page(&filter, params.skip(), params.limit()),
        )?;

        debug!(
            "Executed list query page {} (size {}): {} of {} rows",
            params.page_number(),
            params.page_size(),
            data.len(),
            total_count
        );

        Ok(CachedPage {
            total_count,
            page_number: params.page_number(),
            page_size: params.page_size(),
            data,
        })
    }
}
