//! Primary/replica routing through `CatalogService`.
//!
//! Replica outages fail over to the primary; primary outages fail writes;
//! store deadlines turn slow stores into `Error::Timeout`.

use catalog_cache::backend::InMemoryBackend;
use catalog_cache::model::{Product, ProductDraft};
use catalog_cache::query::ProductFilter;
use catalog_cache::repository::InMemoryProductStore;
use catalog_cache::strategy::Route;
use catalog_cache::{
    CatalogService, Error, OperationConfig, Price, ProductStore, QueryParameters,
    ReadConsistency, StoreRouter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn draft(name: &str) -> ProductDraft {
    ProductDraft::new(name, "", "Category 1", Price::from_units(10))
}

fn replicated() -> (
    CatalogService<InMemoryBackend, InMemoryProductStore>,
    InMemoryProductStore,
    InMemoryProductStore,
) {
    let primary = InMemoryProductStore::new();
    let replica = InMemoryProductStore::new();
    let service = CatalogService::builder(
        InMemoryBackend::new(),
        StoreRouter::new(primary.clone()).with_replica(replica.clone()),
    )
    .build();
    (service, primary, replica)
}

#[tokio::test]
async fn test_replica_serves_eventual_reads() {
    let (service, primary, replica) = replicated();
    assert_eq!(
        service.router().route_read(ReadConsistency::Eventual),
        Route::Replica
    );

    service.create_product(draft("a")).await.expect("Create failed");
    assert_eq!(primary.len(), 1);
    assert!(replica.is_empty(), "writes must never reach the replica");

    // Lagging replica: the list does not see the new row yet.
    let page = service
        .list_products(&QueryParameters::default())
        .await
        .expect("List failed");
    assert_eq!(page.total_count, 0);
}

#[tokio::test]
async fn test_read_your_writes_hits_primary() {
    let (service, _, _) = replicated();
    let created = service.create_product(draft("a")).await.expect("Create failed");

    let eventual = service.get_product(created.id, ReadConsistency::Eventual).await;
    assert!(matches!(eventual, Err(Error::NotFound(_))));

    let strong = service
        .get_product(created.id, ReadConsistency::ReadYourWrites)
        .await
        .expect("Primary read failed");
    assert_eq!(strong, created);
}

#[tokio::test]
async fn test_replica_catches_up() {
    let (service, primary, replica) = replicated();
    service.create_product(draft("a")).await.expect("Create failed");
    replica.replicate_from(&primary).expect("Replication failed");

    let all = service.list_all().await.expect("List all failed");
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_replica_outage_fails_over_to_primary() {
    let (service, _, replica) = replicated();
    service.create_product(draft("a")).await.expect("Create failed");
    replica.set_available(false);

    let page = service
        .list_products(&QueryParameters::default())
        .await
        .expect("Fail-over read failed");
    assert_eq!(page.total_count, 1);

    let product = service
        .get_product(1, ReadConsistency::Eventual)
        .await
        .expect("Fail-over read failed");
    assert_eq!(product.name, "a");
}

#[tokio::test]
async fn test_both_down_surfaces_unavailable() {
    let (service, primary, replica) = replicated();
    primary.set_available(false);
    replica.set_available(false);

    let err = service
        .list_products(&QueryParameters::default())
        .await
        .expect_err("Read must fail with both stores down");
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_primary_outage_fails_writes() {
    let (service, primary, replica) = replicated();
    primary.set_available(false);

    let err = service
        .create_product(draft("a"))
        .await
        .expect_err("Write must fail with the primary down");
    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert!(replica.is_empty());

    // Reads on the replica keep working.
    assert!(service
        .list_products(&QueryParameters::default())
        .await
        .is_ok());

    let err = service
        .get_product(1, ReadConsistency::ReadYourWrites)
        .await
        .expect_err("Primary read must fail with the primary down");
    assert!(matches!(err, Error::StoreUnavailable(_)));
}

/// Store that answers after a fixed delay and counts calls.
#[derive(Clone)]
struct SlowStore {
    inner: InMemoryProductStore,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        SlowStore {
            inner: InMemoryProductStore::new(),
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
    }
}

impl ProductStore for SlowStore {
    async fn fetch_by_id(&self, id: i64) -> catalog_cache::Result<Option<Product>> {
        self.pause().await;
        self.inner.fetch_by_id(id).await
    }

    async fn count(&self, filter: &ProductFilter) -> catalog_cache::Result<u64> {
        self.pause().await;
        self.inner.count(filter).await
    }

    async fn fetch_page(
        &self,
        filter: &ProductFilter,
        skip: u64,
        limit: u64,
    ) -> catalog_cache::Result<Vec<Product>> {
        self.pause().await;
        self.inner.fetch_page(filter, skip, limit).await
    }

    async fn insert(&self, draft: ProductDraft) -> catalog_cache::Result<Product> {
        self.pause().await;
        self.inner.insert(draft).await
    }

    async fn update(
        &self,
        id: i64,
        draft: ProductDraft,
    ) -> catalog_cache::Result<Option<Product>> {
        self.pause().await;
        self.inner.update(id, draft).await
    }

    async fn delete(&self, id: i64) -> catalog_cache::Result<Option<Product>> {
        self.pause().await;
        self.inner.delete(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_store_deadline_times_out_once() {
    let store = SlowStore::new(Duration::from_secs(2));
    let service = CatalogService::builder(InMemoryBackend::new(), StoreRouter::new(store.clone()))
        .with_deadline(Duration::from_millis(500))
        .build();

    let err = service
        .get_product(1, ReadConsistency::Eventual)
        .await
        .expect_err("Slow store must time out");
    assert!(matches!(err, Error::Timeout(_)));
    assert_eq!(err.status_code(), 504);
    assert_eq!(store.calls.load(Ordering::SeqCst), 1, "no retry on timeout");

    let err = service
        .create_product(draft("a"))
        .await
        .expect_err("Slow store must time out");
    assert!(matches!(err, Error::Timeout(_)));
}

#[tokio::test(start_paused = true)]
async fn test_operation_deadline_overrides_default() {
    let store = SlowStore::new(Duration::from_secs(2));
    store.inner.insert(draft("a")).await.expect("Insert failed");

    let service = CatalogService::builder(InMemoryBackend::new(), StoreRouter::new(store))
        .with_deadline(Duration::from_millis(500))
        .build();

    let product = service
        .get_product_with_config(
            1,
            ReadConsistency::Eventual,
            OperationConfig::default().with_deadline(Duration::from_secs(5)),
        )
        .await
        .expect("Generous deadline must succeed");
    assert_eq!(product.name, "a");
}
