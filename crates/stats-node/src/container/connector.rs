//! # Event Store Connector
//!
//! The node serves HTTP before its store is open. The connector opens the
//! configured backend on the blocking pool, retrying until it succeeds or
//! the node shuts down, then attaches it to the shared `StoreHandle`.

use stats_gateway::{BlockingStoreAdapter, StatsStore, StoreBackend, StoreConfig, StoreHandle};
use stats_store::{EventStoreService, KVStoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Failures to open a store backend.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to open store: {0}")]
    Open(#[from] KVStoreError),

    #[error("store backend {0:?} is not compiled into this build")]
    Unsupported(StoreBackend),

    #[error("store open task failed: {0}")]
    Task(String),
}

impl ConnectError {
    /// Whether another attempt can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnectError::Unsupported(_))
    }
}

/// Open the configured backend, blocking the calling thread.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn StatsStore>, ConnectError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(BlockingStoreAdapter::new(
            EventStoreService::new_in_memory(),
        ))),
        StoreBackend::RocksDb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StoreConfig) -> Result<Arc<dyn StatsStore>, ConnectError> {
    use crate::adapters::storage::{RocksDbConfig, RocksDbStore};
    use stats_store::SystemTimeSource;

    let kv = RocksDbStore::open(RocksDbConfig {
        path: config.data_dir.clone(),
        column_family: config.database.clone(),
        sync_writes: config.sync_writes,
        ..Default::default()
    })?;
    Ok(Arc::new(BlockingStoreAdapter::new(EventStoreService::new(
        kv,
        SystemTimeSource,
    ))))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(config: &StoreConfig) -> Result<Arc<dyn StatsStore>, ConnectError> {
    Err(ConnectError::Unsupported(config.backend))
}

/// Open the store and attach it to `handle`, retrying every
/// `config.connect_retry` until success or shutdown.
///
/// Returns whether a store was attached.
pub async fn connect_with_retry(
    handle: StoreHandle,
    config: StoreConfig,
    mut shutdown: watch::Receiver<bool>,
) -> bool {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return false;
        }
        attempt += 1;
        debug!(attempt, backend = ?config.backend, "Opening event store");

        let open_config = config.clone();
        let result = tokio::task::spawn_blocking(move || open_store(&open_config))
            .await
            .unwrap_or_else(|e| Err(ConnectError::Task(e.to_string())));

        match result {
            Ok(store) => {
                handle.connect(store);
                info!(
                    backend = ?config.backend,
                    database = %config.database,
                    attempt,
                    "Connected to the database"
                );
                return true;
            }
            Err(e) if !e.is_retryable() => {
                error!(error = %e, "Event store cannot be opened; serving without it");
                return false;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    attempt,
                    retry_in_ms = config.connect_retry.as_millis() as u64,
                    "Event store connection failed"
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(config.connect_retry) => {}
            _ = shutdown.changed() => {
                info!("Shutdown signal received by store connector");
                return false;
            }
        }
    }
}
