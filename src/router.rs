//! Primary/replica routing.
//!
//! Two independent store handles, picked explicitly per call:
//!
//! - writes always go to the primary, and a primary fault fails the write
//! - `Eventual` reads go to the replica when one is configured, failing over
//!   to the primary if the replica is unreachable
//! - `ReadYourWrites` reads go to the primary

use crate::error::Result;
use crate::repository::ProductStore;
use crate::strategy::{ReadConsistency, Route};
use std::future::Future;

/// Routes store calls between a primary and an optional read replica.
pub struct StoreRouter<S: ProductStore> {
    primary: S,
    replica: Option<S>,
}

impl<S: ProductStore> StoreRouter<S> {
    /// Router with a primary only; every read goes to the primary.
    pub fn new(primary: S) -> Self {
        StoreRouter {
            primary,
            replica: None,
        }
    }

    /// Add a read replica.
    pub fn with_replica(mut self, replica: S) -> Self {
        self.replica = Some(replica);
        self
    }

    pub fn primary(&self) -> &S {
        &self.primary
    }

    pub fn replica(&self) -> Option<&S> {
        self.replica.as_ref()
    }

    /// Where a read with this consistency is sent first.
    pub fn route_read(&self, consistency: ReadConsistency) -> Route {
        match (consistency, &self.replica) {
            (ReadConsistency::Eventual, Some(_)) => Route::Replica,
            _ => Route::Primary,
        }
    }

    /// Where writes are sent: always the primary.
    pub fn route_write(&self) -> Route {
        Route::Primary
    }

    /// Run a read on the routed store.
    ///
    /// If the replica answers `StoreUnavailable`, the read is re-run on the
    /// primary. Any other replica error is returned as is.
    ///
    /// # Errors
    ///
    /// Returns the primary's error when the primary serves (or takes over)
    /// the read and fails.
    pub async fn read<'a, T, F, Fut>(&'a self, consistency: ReadConsistency, op: F) -> Result<T>
    where
        F: Fn(&'a S) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match (consistency, &self.replica) {
            (ReadConsistency::Eventual, Some(replica)) => match op(replica).await {
                Err(e) if e.is_unavailable() => {
                    warn!("Replica unavailable, failing over to primary: {}", e);
                    op(&self.primary).await
                }
                other => other,
            },
            _ => op(&self.primary).await,
        }
    }

    /// Run a write on the primary. No fallback, no retry.
    ///
    /// # Errors
    ///
    /// Returns the primary's error unchanged.
    pub async fn write<'a, T, F, Fut>(&'a self, op: F) -> Result<T>
    where
        F: FnOnce(&'a S) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        op(&self.primary).await
    }
}
