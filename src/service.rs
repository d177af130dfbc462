//! Cache-aside catalog service.
//!
//! Reads consult the cache first and fall back to the routed store on a miss,
//! populating the cache with a TTL. Writes go to the primary and, only once
//! they have committed, invalidate every cached list page, the full listing
//! and the written product.
//!
//! ```text
//! read:   cache HIT ──────────────────────────────► return
//!         cache MISS ─► router (replica | primary) ─► populate ─► return
//!
//! write:  primary ─► OK  ─► invalidate ─► return
//!                └─► ERR ─────────────────► return error (cache untouched)
//! ```

use crate::backend::CacheBackend;
use crate::cache::{CacheStore, DEFAULT_CACHE_TIMEOUT, DEFAULT_INVALIDATE_TIMEOUT};
use crate::config::CatalogConfig;
use crate::error::{Error, Result};
use crate::key::{CacheKeyBuilder, ALL_PRODUCTS_KEY, LIST_PREFIX};
use crate::model::{CachedPage, Product, ProductDraft};
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::params::QueryParameters;
use crate::query::QueryExecutor;
use crate::repository::ProductStore;
use crate::router::StoreRouter;
use crate::strategy::ReadConsistency;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-operation overrides.
///
/// Setup-time settings (TTL policy, default store deadline) live on the
/// service; an `OperationConfig` changes them for one call only.
///
/// ```
/// use catalog_cache::OperationConfig;
/// use std::time::Duration;
///
/// let config = OperationConfig::default()
///     .with_ttl(Duration::from_secs(5))
///     .with_deadline(Duration::from_millis(200));
/// assert_eq!(config.ttl_override, Some(Duration::from_secs(5)));
/// ```
#[derive(Clone, Debug, Default)]
pub struct OperationConfig {
    /// TTL for the value this call populates. `None` uses the [`TtlPolicy`].
    pub ttl_override: Option<Duration>,

    /// Bound on the store calls of this operation. `None` uses the service
    /// default. Expiry fails the call with `Error::Timeout`; it is never
    /// retried.
    pub deadline: Option<Duration>,
}

impl OperationConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

struct Inner<B: CacheBackend, S: ProductStore> {
    cache: CacheStore<B>,
    router: StoreRouter<S>,
    ttl_policy: TtlPolicy,
    store_deadline: Option<Duration>,
}

/// Cache-aside product catalog.
///
/// Cheap to clone; clones share the cache adapter and the store handles.
///
/// # Example
///
/// ```
/// use catalog_cache::backend::InMemoryBackend;
/// use catalog_cache::model::{Price, ProductDraft};
/// use catalog_cache::params::QueryParameters;
/// use catalog_cache::repository::InMemoryProductStore;
/// use catalog_cache::CatalogService;
///
/// # async fn example() -> catalog_cache::Result<()> {
/// let service = CatalogService::new(InMemoryBackend::new(), InMemoryProductStore::new());
///
/// service
///     .create_product(ProductDraft::new("Lamp", "Desk lamp", "Lighting", Price::from_units(25)))
///     .await?;
///
/// let page = service.list_products(&QueryParameters::default()).await?;
/// assert_eq!(page.total_count, 1);
/// # Ok(())
/// # }
/// ```
pub struct CatalogService<B: CacheBackend, S: ProductStore> {
    inner: Arc<Inner<B, S>>,
}

impl<B: CacheBackend, S: ProductStore> Clone for CatalogService<B, S> {
    fn clone(&self) -> Self {
        CatalogService {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CacheBackend, S: ProductStore> CatalogService<B, S> {
    /// Service over one store with default settings.
    pub fn new(backend: B, primary: S) -> Self {
        Self::builder(backend, StoreRouter::new(primary)).build()
    }

    pub fn builder(backend: B, router: StoreRouter<S>) -> CatalogServiceBuilder<B, S> {
        CatalogServiceBuilder {
            backend,
            router,
            ttl_policy: TtlPolicy::default(),
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            invalidate_timeout: DEFAULT_INVALIDATE_TIMEOUT,
            metrics: Box::new(NoOpMetrics),
            store_deadline: None,
        }
    }

    /// Service with timeouts, TTLs and deadline taken from `config`.
    pub fn from_config(backend: B, router: StoreRouter<S>, config: &CatalogConfig) -> Self {
        Self::builder(backend, router).with_config(config).build()
    }

    /// One page of products matching `params`.
    ///
    /// # Errors
    ///
    /// Store errors (after replica fail-over) and `Error::Timeout` when the
    /// store deadline expires. Cache faults never surface.
    pub async fn list_products(&self, params: &QueryParameters) -> Result<CachedPage> {
        self.list_products_with_config(params, OperationConfig::default())
            .await
    }

    /// [`CatalogService::list_products`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::list_products`].
    pub async fn list_products_with_config(
        &self,
        params: &QueryParameters,
        config: OperationConfig,
    ) -> Result<CachedPage> {
        let timer = Instant::now();
        let key = CacheKeyBuilder::list(params);

        if let Some(page) = self.inner.cache.get_entity::<CachedPage>(&key).await {
            debug!("✓ Served {} from cache", key);
            return Ok(page);
        }

        let page = self
            .within_deadline(
                "list",
                config.deadline,
                self.inner
                    .router
                    .read(ReadConsistency::Eventual, |store| {
                        QueryExecutor::execute(params, store)
                    }),
            )
            .await?;

        let ttl = config
            .ttl_override
            .unwrap_or_else(|| self.inner.ttl_policy.for_page(params));
        self.inner.cache.set_entity(&key, &page, ttl).await;

        info!(
            "✓ Listed {} ({} of {} rows) from store in {:?}",
            key,
            page.data.len(),
            page.total_count,
            timer.elapsed()
        );
        Ok(page)
    }

    /// Every product, ordered by id.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::list_products`].
    pub async fn list_all(&self) -> Result<Vec<Product>> {
        self.list_all_with_config(OperationConfig::default()).await
    }

    /// [`CatalogService::list_all`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::list_products`].
    pub async fn list_all_with_config(&self, config: OperationConfig) -> Result<Vec<Product>> {
        if let Some(products) = self
            .inner
            .cache
            .get_entity::<Vec<Product>>(ALL_PRODUCTS_KEY)
            .await
        {
            return Ok(products);
        }

        let products = self
            .within_deadline(
                "list_all",
                config.deadline,
                self.inner
                    .router
                    .read(ReadConsistency::Eventual, |store| store.fetch_all()),
            )
            .await?;

        let ttl = config.ttl_override.unwrap_or(self.inner.ttl_policy.listing);
        self.inner
            .cache
            .set_entity(ALL_PRODUCTS_KEY, &products, ttl)
            .await;

        info!("✓ Listed all {} products from store", products.len());
        Ok(products)
    }

    /// One product by id.
    ///
    /// `Eventual` reads go through the `product:{id}` cache entry.
    /// `ReadYourWrites` skips the cache, reads the primary and leaves the cache
    /// as it was.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if no such product exists, otherwise as
    /// [`CatalogService::list_products`].
    pub async fn get_product(&self, id: i64, consistency: ReadConsistency) -> Result<Product> {
        self.get_product_with_config(id, consistency, OperationConfig::default())
            .await
    }

    /// [`CatalogService::get_product`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::get_product`].
    pub async fn get_product_with_config(
        &self,
        id: i64,
        consistency: ReadConsistency,
        config: OperationConfig,
    ) -> Result<Product> {
        let key = CacheKeyBuilder::product(id);

        if consistency == ReadConsistency::Eventual {
            if let Some(product) = self.inner.cache.get_entity::<Product>(&key).await {
                return Ok(product);
            }
        }

        let found = self
            .within_deadline(
                "get",
                config.deadline,
                self.inner
                    .router
                    .read(consistency, |store| store.fetch_by_id(id)),
            )
            .await?;
        let product = found.ok_or_else(|| not_found(id))?;

        if consistency == ReadConsistency::Eventual {
            let ttl = config.ttl_override.unwrap_or(self.inner.ttl_policy.item);
            self.inner.cache.set_entity(&key, &product, ttl).await;
        }

        debug!("Loaded {} from store ({})", key, consistency);
        Ok(product)
    }

    /// Insert a product on the primary.
    ///
    /// # Errors
    ///
    /// `Error::ValidationError` for an invalid draft (nothing is written), the
    /// primary's error, or `Error::Timeout`. The cache is untouched on error.
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        self.create_product_with_config(draft, OperationConfig::default())
            .await
    }

    /// [`CatalogService::create_product`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::create_product`].
    pub async fn create_product_with_config(
        &self,
        draft: ProductDraft,
        config: OperationConfig,
    ) -> Result<Product> {
        draft.validate()?;

        let product = self
            .within_deadline(
                "create",
                config.deadline,
                self.inner.router.write(|store| store.insert(draft)),
            )
            .await?;

        self.invalidate_after_write(product.id).await;
        info!("✓ Created product {}", product.id);
        Ok(product)
    }

    /// Replace the writable fields of product `id` on the primary.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if `id` does not exist (no invalidation), otherwise
    /// as [`CatalogService::create_product`].
    pub async fn update_product(&self, id: i64, draft: ProductDraft) -> Result<Product> {
        self.update_product_with_config(id, draft, OperationConfig::default())
            .await
    }

    /// [`CatalogService::update_product`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::update_product`].
    pub async fn update_product_with_config(
        &self,
        id: i64,
        draft: ProductDraft,
        config: OperationConfig,
    ) -> Result<Product> {
        draft.validate()?;

        let updated = self
            .within_deadline(
                "update",
                config.deadline,
                self.inner.router.write(|store| store.update(id, draft)),
            )
            .await?;
        let product = updated.ok_or_else(|| not_found(id))?;

        self.invalidate_after_write(id).await;
        info!("✓ Updated product {}", id);
        Ok(product)
    }

    /// Delete product `id` on the primary, returning the deleted row.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if `id` does not exist (no invalidation), otherwise
    /// the primary's error or `Error::Timeout`.
    pub async fn delete_product(&self, id: i64) -> Result<Product> {
        self.delete_product_with_config(id, OperationConfig::default())
            .await
    }

    /// [`CatalogService::delete_product`] with per-call overrides.
    ///
    /// # Errors
    ///
    /// See [`CatalogService::delete_product`].
    pub async fn delete_product_with_config(
        &self,
        id: i64,
        config: OperationConfig,
    ) -> Result<Product> {
        let deleted = self
            .within_deadline(
                "delete",
                config.deadline,
                self.inner.router.write(|store| store.delete(id)),
            )
            .await?;
        let product = deleted.ok_or_else(|| not_found(id))?;

        self.invalidate_after_write(id).await;
        info!("✓ Deleted product {}", id);
        Ok(product)
    }

    /// Whether the cache backend answers.
    pub async fn health_check(&self) -> bool {
        self.inner.cache.health_check().await
    }

    pub fn router(&self) -> &StoreRouter<S> {
        &self.inner.router
    }

    pub fn cache(&self) -> &CacheStore<B> {
        &self.inner.cache
    }

    /// Drop every cached read a write to `id` can change.
    async fn invalidate_after_write(&self, id: i64) {
        let item_key = CacheKeyBuilder::product(id);
        let (pages, (), ()) = futures::join!(
            self.inner.cache.invalidate_prefix(LIST_PREFIX),
            self.inner.cache.invalidate_key(ALL_PRODUCTS_KEY),
            self.inner.cache.invalidate_key(&item_key),
        );
        debug!(
            "Invalidated {} list pages, {} and {}",
            pages, ALL_PRODUCTS_KEY, item_key
        );
    }

    async fn within_deadline<T>(
        &self,
        op: &str,
        deadline: Option<Duration>,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match deadline.or(self.inner.store_deadline) {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Store {} exceeded deadline of {:?}", op, limit);
                    Err(Error::Timeout(format!(
                        "store {} exceeded {:?}",
                        op, limit
                    )))
                }
            },
            None => fut.await,
        }
    }
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("product {}", id))
}

/// Builder for [`CatalogService`].
pub struct CatalogServiceBuilder<B: CacheBackend, S: ProductStore> {
    backend: B,
    router: StoreRouter<S>,
    ttl_policy: TtlPolicy,
    cache_timeout: Duration,
    invalidate_timeout: Duration,
    metrics: Box<dyn CacheMetrics>,
    store_deadline: Option<Duration>,
}

impl<B: CacheBackend, S: ProductStore> CatalogServiceBuilder<B, S> {
    /// Take TTLs, cache timeouts and the store deadline from `config`.
    pub fn with_config(mut self, config: &CatalogConfig) -> Self {
        self.ttl_policy = config.ttl_policy();
        self.cache_timeout = config.cache_timeout;
        self.invalidate_timeout = config.invalidate_timeout;
        self.store_deadline = config.store_deadline;
        self
    }

    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Bound on each cache call.
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Bound on dropping every cached list page after a write.
    pub fn with_invalidation_timeout(mut self, timeout: Duration) -> Self {
        self.invalidate_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Default bound on store calls, for operations that set none.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.store_deadline = Some(deadline);
        self
    }

    pub fn build(self) -> CatalogService<B, S> {
        let cache = CacheStore::new(self.backend)
            .with_timeout(self.cache_timeout)
            .with_invalidation_timeout(self.invalidate_timeout)
            .with_metrics(self.metrics);

        CatalogService {
            inner: Arc::new(Inner {
                cache,
                router: self.router,
                ttl_policy: self.ttl_policy,
                store_deadline: self.store_deadline,
            }),
        }
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::model::Price;
    use crate::observability::CountingMetrics;
    use crate::repository::InMemoryProductStore;

    fn draft(name: &str, price: u32) -> ProductDraft {
        ProductDraft::new(name, "", "Category 1", Price::from_units(price))
    }

    fn service() -> (
        CatalogService<InMemoryBackend, InMemoryProductStore>,
        InMemoryBackend,
    ) {
        let backend = InMemoryBackend::new();
        let service = CatalogService::new(backend.clone(), InMemoryProductStore::new());
        (service, backend)
    }

    #[tokio::test]
    async fn test_list_populates_cache() {
        let (service, backend) = service();
        service.create_product(draft("a", 10)).await.unwrap();

        let params = QueryParameters::default();
        let page = service.list_products(&params).await.unwrap();
        assert_eq!(page.total_count, 1);

        let cached = backend
            .get(&CacheKeyBuilder::list(&params))
            .await
            .unwrap()
            .expect("Page not cached");
        let decoded: CachedPage = serde_json::from_slice(&cached).unwrap();
        assert_eq!(decoded, page);
    }

    #[tokio::test]
    async fn test_write_invalidates_lists_and_item() {
        let (service, backend) = service();
        let created = service.create_product(draft("a", 10)).await.unwrap();

        service.list_products(&QueryParameters::default()).await.unwrap();
        service.list_all().await.unwrap();
        service
            .get_product(created.id, ReadConsistency::Eventual)
            .await
            .unwrap();
        assert_eq!(backend.len(), 3);

        service
            .update_product(created.id, draft("b", 20))
            .await
            .unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_missing_update_leaves_cache() {
        let (service, backend) = service();
        service.list_products(&QueryParameters::default()).await.unwrap();

        let result = service.update_product(42, draft("x", 1)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(backend.len(), 1);

        let result = service.delete_product(42).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_before_write() {
        let (service, _) = service();
        let result = service.create_product(draft("  ", 1)).await;
        assert!(matches!(result, Err(Error::ValidationError(_))));
        assert!(service.router().primary().is_empty());
    }

    #[tokio::test]
    async fn test_read_your_writes_skips_cache() {
        let (service, backend) = service();
        let created = service.create_product(draft("a", 10)).await.unwrap();

        let product = service
            .get_product(created.id, ReadConsistency::ReadYourWrites)
            .await
            .unwrap();
        assert_eq!(product, created);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_hit_counts() {
        let metrics = Arc::new(CountingMetrics::new());
        let service = CatalogService::builder(
            InMemoryBackend::new(),
            StoreRouter::new(InMemoryProductStore::new()),
        )
        .with_metrics(Box::new(metrics.clone()))
        .build();

        let params = QueryParameters::default();
        service.list_products(&params).await.unwrap();
        service.list_products(&params).await.unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.sets, 1);
    }

    #[tokio::test]
    async fn test_ttl_override_applies() {
        let (service, backend) = service();
        let config = OperationConfig::default().with_ttl(Duration::from_secs(1));
        service
            .list_all_with_config(config)
            .await
            .unwrap();
        assert!(backend.get(ALL_PRODUCTS_KEY).await.unwrap().is_some());
    }

    #[test]
    fn test_from_config_uses_settings() {
        let config = CatalogConfig {
            store_deadline: Some(Duration::from_millis(250)),
            ..CatalogConfig::default()
        };
        let service = CatalogService::from_config(
            InMemoryBackend::new(),
            StoreRouter::new(InMemoryProductStore::new()),
            &config,
        );
        assert_eq!(service.inner.store_deadline, Some(Duration::from_millis(250)));
        assert_eq!(service.inner.ttl_policy, TtlPolicy::default());
    }
}
