//! # catalog-cache
//!
//! A cache-aside layer for a paginated, filterable product catalog.
//!
//! ## Features
//!
//! - **Deterministic cache keys:** every distinct, normalized list query maps
//!   to exactly one key, with user values escaped
//! - **Advisory cache:** cache calls are timeout-bounded, and a slow or
//!   broken cache degrades to a miss
//! - **Read replicas:** eventual reads go to a replica and fail over to the
//!   primary; writes and read-your-writes reads always hit the primary
//! - **Backend agnostic:** in-memory (`DashMap`) or Redis cache, in-memory or
//!   PostgreSQL store
//! - **Write invalidation:** every committed write drops all cached list pages
//!
//! ## Quick Start
//!
//! ```
//! use catalog_cache::backend::InMemoryBackend;
//! use catalog_cache::model::{Price, ProductDraft};
//! use catalog_cache::repository::InMemoryProductStore;
//! use catalog_cache::router::StoreRouter;
//! use catalog_cache::{CatalogService, QueryParameters, ReadConsistency};
//!
//! # async fn example() -> catalog_cache::Result<()> {
//! let primary = InMemoryProductStore::new();
//! let replica = InMemoryProductStore::new();
//!
//! let service = CatalogService::builder(
//!     InMemoryBackend::new(),
//!     StoreRouter::new(primary).with_replica(replica),
//! )
//! .build();
//!
//! let created = service
//!     .create_product(ProductDraft::new("Lamp", "Desk lamp", "Lighting", Price::from_units(25)))
//!     .await?;
//!
//! // The replica may lag; read the primary right after a write.
//! let product = service
//!     .get_product(created.id, ReadConsistency::ReadYourWrites)
//!     .await?;
//! assert_eq!(product, created);
//!
//! let params = QueryParameters::builder()
//!     .category("Lighting")
//!     .page(1, 20)
//!     .build()?;
//! let page = service.list_products(&params).await?;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod config;
pub mod entity;
pub mod error;
pub mod key;
pub mod model;
pub mod observability;
pub mod params;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod repository;
pub mod router;
pub mod service;
pub mod strategy;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use cache::CacheStore;
pub use config::CatalogConfig;
pub use entity::CacheEntity;
pub use error::{Error, Result};
pub use key::CacheKeyBuilder;
pub use model::{CachedPage, Price, Product, ProductDraft};
pub use params::{ProductQuery, QueryParameters};
pub use query::QueryExecutor;
pub use repository::ProductStore;
pub use router::StoreRouter;
pub use service::{CatalogService, OperationConfig};
pub use strategy::ReadConsistency;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
