use crate::backend::{BackendError, MappingBackend};
use crate::metrics_defs::{SYNC_DECODE_ERRORS, SYNC_PATHS, SYNC_REFRESH_DURATION, SYNC_REFRESHES};
use crate::store::MappingStore;
use crate::types::decode_snapshot;
use futures::StreamExt;
use shared::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Instant;

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("mapping store error: {0}")]
    Backend(#[from] BackendError),
    #[error("subscription to mapping updates closed")]
    SubscriptionClosed,
}

/// Keeps a [`MappingStore`] in line with the distributed snapshot.
///
/// The distributed snapshot is the truth: every refresh replaces the local
/// table outright.
pub struct Synchronizer {
    backend: Arc<dyn MappingBackend>,
    store: MappingStore,
}

impl Synchronizer {
    pub fn new(backend: Arc<dyn MappingBackend>, store: MappingStore) -> Self {
        Synchronizer { backend, store }
    }

    /// Subscribes to invalidations, loads the initial snapshot and then
    /// refreshes on every invalidation. Only returns when the store becomes
    /// unreachable, which callers must treat as fatal.
    pub async fn run(&self) -> Result<(), SyncError> {
        // Subscribe first so an update published during the initial load is not missed.
        let mut invalidations = self.backend.subscribe().await?;
        self.refresh().await?;

        while let Some(invalidation) = invalidations.next().await {
            invalidation?;
            self.refresh().await?;
        }

        Err(SyncError::SubscriptionClosed)
    }

    /// Fetches the full snapshot and replaces the store with it.
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        let started = Instant::now();

        let raw = self.backend.fetch_snapshot().await?;
        let (table, failures) = decode_snapshot(raw);
        if failures > 0 {
            counter!(SYNC_DECODE_ERRORS).increment(failures as u64);
        }

        let paths = table.len();
        self.store.replace(table);

        counter!(SYNC_REFRESHES).increment(1);
        gauge!(SYNC_PATHS).set(paths as f64);
        histogram!(SYNC_REFRESH_DURATION).record(started.elapsed().as_secs_f64());
        tracing::info!(paths, skipped = failures, "applied mapping snapshot");

        Ok(paths)
    }
}
