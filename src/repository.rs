//! Relational store abstraction for products.
//!
//! `ProductStore` is the seam between the cache layer and the source of
//! truth. The router holds two independent handles of the same store type, a
//! primary and an optional replica; nothing in this crate assumes which one it
//! is talking to.
//!
//! Implementations:
//! - [`InMemoryProductStore`]: ordered map, for tests, demos and small catalogs
//! - `PgProductStore` (feature `postgres`): sqlx over PostgreSQL
//!
//! # Error Handling
//!
//! Return `Error::StoreUnavailable` when the store cannot be reached (the
//! router fails reads over to the primary on it) and `Error::StoreError` for
//! anything else.

use crate::error::{Error, Result};
use crate::model::{Product, ProductDraft};
use crate::query::ProductFilter;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// Trait for product store implementations.
///
/// All list reads order by id ascending.
#[allow(async_fn_in_trait)]
pub trait ProductStore: Send + Sync {
    /// Fetch one product.
    ///
    /// # Returns
    /// - `Ok(Some(product))` - Product found
    /// - `Ok(None)` - No such id (not an error)
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    async fn fetch_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Count rows matching `filter`, ignoring pagination.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    async fn count(&self, filter: &ProductFilter) -> Result<u64>;

    /// Rows matching `filter`, ordered by id, skipping `skip` and taking `limit`.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    async fn fetch_page(&self, filter: &ProductFilter, skip: u64, limit: u64)
        -> Result<Vec<Product>>;

    /// Every product, ordered by id.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the query fails
    async fn fetch_all(&self) -> Result<Vec<Product>> {
        self.fetch_page(&ProductFilter::default(), 0, u64::MAX).await
    }

    /// Insert a product; the store assigns the id.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the statement fails
    async fn insert(&self, draft: ProductDraft) -> Result<Product>;

    /// Replace the writable fields of `id`. `Ok(None)` if absent.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the statement fails
    async fn update(&self, id: i64, draft: ProductDraft) -> Result<Option<Product>>;

    /// Delete `id`, returning the deleted row. `Ok(None)` if absent.
    ///
    /// # Errors
    /// Returns `Err` if the store is unavailable or the statement fails
    async fn delete(&self, id: i64) -> Result<Option<Product>>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

struct InMemoryState {
    rows: RwLock<BTreeMap<i64, Product>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

/// In-memory product store.
///
/// Clones share the same rows. Two separately created stores are independent,
/// which is how tests model a primary and a lagging replica;
/// [`InMemoryProductStore::replicate_from`] brings a replica up to date.
///
/// # Example
///
/// ```ignore
/// let primary = InMemoryProductStore::new();
/// let replica = InMemoryProductStore::new();
///
/// primary.insert(draft).await?;
/// assert_eq!(replica.count(&ProductFilter::default()).await?, 0); // lagging
///
/// replica.replicate_from(&primary)?;
/// assert_eq!(replica.count(&ProductFilter::default()).await?, 1);
/// ```
#[derive(Clone)]
pub struct InMemoryProductStore {
    state: Arc<InMemoryState>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        InMemoryProductStore {
            state: Arc::new(InMemoryState {
                rows: RwLock::new(BTreeMap::new()),
                next_id: AtomicI64::new(1),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate an outage (`false`) or recovery (`true`).
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Copy every row of `source` into this store, replacing its contents.
    ///
    /// # Errors
    /// Returns `Err` if either store is unavailable
    pub fn replicate_from(&self, source: &InMemoryProductStore) -> Result<()> {
        source.ensure_available()?;
        self.ensure_available()?;
        let snapshot = source.read_rows()?.clone();
        let next_id = source.state.next_id.load(Ordering::SeqCst);
        *self.write_rows()? = snapshot;
        self.state.next_id.store(next_id, Ordering::SeqCst);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read_rows().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<()> {
        if self.state.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }

    fn read_rows(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<i64, Product>>> {
        self.state
            .rows
            .read()
            .map_err(|_| Error::StoreError("product table lock poisoned".to_string()))
    }

    fn write_rows(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<i64, Product>>> {
        self.state
            .rows
            .write()
            .map_err(|_| Error::StoreError("product table lock poisoned".to_string()))
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore for InMemoryProductStore {
    async fn fetch_by_id(&self, id: i64) -> Result<Option<Product>> {
        self.ensure_available()?;
        Ok(self.read_rows()?.get(&id).cloned())
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64> {
        self.ensure_available()?;
        let rows = self.read_rows()?;
        Ok(rows.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn fetch_page(
        &self,
        filter: &ProductFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Product>> {
        self.ensure_available()?;
        let rows = self.read_rows()?;
        // BTreeMap iterates in key order: id ascending.
        Ok(rows
            .values()
            .filter(|p| filter.matches(p))
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product> {
        self.ensure_available()?;
        let mut rows = self.write_rows()?;
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        let product = Product::from_draft(id, draft);
        rows.insert(id, product.clone());
        Ok(product)
    }

    async fn update(&self, id: i64, draft: ProductDraft) -> Result<Option<Product>> {
        self.ensure_available()?;
        let mut rows = self.write_rows()?;
        Ok(rows.get_mut(&id).map(|row| {
            *row = Product::from_draft(id, draft);
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<Option<Product>> {
        self.ensure_available()?;
        Ok(self.write_rows()?.remove(&id))
    }
}
