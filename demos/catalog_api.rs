//! Catalog HTTP API over the in-memory cache and store.
//!
//! ```text
//! cargo run --example catalog_api
//! curl 'http://127.0.0.1:3000/api/products?pageSize=5&category=Category%201&minPrice=20'
//! ```
//!
//! `catalog_server` serves the same API over Redis and PostgreSQL.

mod api;

use catalog_cache::backend::InMemoryBackend;
use catalog_cache::observability::CountingMetrics;
use catalog_cache::repository::InMemoryProductStore;
use catalog_cache::{CatalogConfig, CatalogService, Price, ProductDraft, ProductStore, StoreRouter};
use std::sync::Arc;

type Catalog = CatalogService<InMemoryBackend, InMemoryProductStore>;

/// 50 products spread over five categories, priced 1.00 to 50.00.
async fn seed(store: &InMemoryProductStore) -> catalog_cache::Result<()> {
    for i in 1..=50u32 {
        store
            .insert(ProductDraft::new(
                format!("Product {}", i),
                format!("Description for product {}", i),
                format!("Category {}", i % 5 + 1),
                Price::from_units(i),
            ))
            .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    let config = CatalogConfig::from_env().expect("Invalid configuration");

    let primary = InMemoryProductStore::new();
    seed(&primary).await.expect("Failed to seed catalog");

    let metrics = Arc::new(CountingMetrics::new());
    let catalog: Catalog =
        CatalogService::builder(InMemoryBackend::new(), StoreRouter::new(primary))
            .with_config(&config)
            .with_metrics(Box::new(metrics.clone()))
            .build();

    api::serve(api::AppState { catalog, metrics }).await;
}
