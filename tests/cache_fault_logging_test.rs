//! Absorbed cache faults must leave a log line even with no metrics handler.
//!
//! Installs a process-wide logger, so these checks live in their own test
//! binary.

use catalog_cache::backend::CacheBackend;
use catalog_cache::repository::InMemoryProductStore;
use catalog_cache::{CatalogService, Error, Price, ProductDraft, QueryParameters};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};
use std::time::Duration;

struct CapturingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

fn install_logger() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("Logger already installed");
        log::set_max_level(LevelFilter::Trace);
    });
}

/// Warnings that mention `needle`.
fn warnings_mentioning(needle: &str) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .expect("Logger poisoned")
        .iter()
        .filter(|(level, line)| *level == Level::Warn && line.contains(needle))
        .map(|(_, line)| line.clone())
        .collect()
}

/// Backend that refuses every call with a recognizable message.
#[derive(Clone)]
struct RefusingCache;

const REFUSAL: &str = "connection refused by test cache";

impl CacheBackend for RefusingCache {
    async fn get(&self, _key: &str) -> catalog_cache::Result<Option<Vec<u8>>> {
        Err(Error::CacheUnavailable(REFUSAL.to_string()))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Option<Duration>,
    ) -> catalog_cache::Result<()> {
        Err(Error::CacheUnavailable(REFUSAL.to_string()))
    }

    async fn delete(&self, _key: &str) -> catalog_cache::Result<()> {
        Err(Error::CacheUnavailable(REFUSAL.to_string()))
    }

    async fn scan_prefix(&self, _prefix: &str) -> catalog_cache::Result<Vec<String>> {
        Err(Error::CacheUnavailable(REFUSAL.to_string()))
    }

    async fn clear_all(&self) -> catalog_cache::Result<()> {
        Err(Error::CacheUnavailable(REFUSAL.to_string()))
    }
}

#[tokio::test]
async fn test_absorbed_faults_are_logged_without_metrics() {
    install_logger();
    let service = CatalogService::new(RefusingCache, InMemoryProductStore::new());

    service
        .create_product(ProductDraft::new(
            "Lamp",
            "Desk lamp",
            "Category 1",
            Price::from_units(25),
        ))
        .await
        .expect("Create must succeed without a cache");
    let page = service
        .list_products(&QueryParameters::default())
        .await
        .expect("List must succeed without a cache");
    assert_eq!(page.total_count, 1);

    let warnings = warnings_mentioning(REFUSAL);
    // Three invalidations on create, then a GET and a SET on the list miss.
    assert!(warnings.len() >= 5, "fault warnings: {:?}", warnings);
    for op in ["DELETE_PREFIX", "DELETE", "GET", "SET"] {
        assert!(
            warnings.iter().any(|line| line.contains(op)),
            "no warning for {}: {:?}",
            op,
            warnings
        );
    }
}
