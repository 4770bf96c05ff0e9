//! Store adapters.
//!
//! - `BlockingStoreAdapter` runs a synchronous `EventStoreApi` on the
//!   blocking pool behind a read/write lock.
//! - `StoreHandle` is the swappable connection slot the node's connector
//!   fills once the backend opens.

use crate::ports::outbound::StatsStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use stats_store::{EventStoreApi, Identity, RecordId, StoreError};
use std::sync::Arc;
use tracing::info;

/// Adapts a synchronous `EventStoreApi` to the async `StatsStore` port.
///
/// Reads share the lock; mutations take it exclusively.
pub struct BlockingStoreAdapter<S> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for BlockingStoreAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> BlockingStoreAdapter<S>
where
    S: EventStoreApi + Send + Sync + 'static,
{
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Shared access to the wrapped store, for inspection in tests and tools.
    pub fn inner(&self) -> Arc<RwLock<S>> {
        Arc::clone(&self.inner)
    }

    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner.read()))
            .await
            .map_err(join_error)?
    }

    async fn write<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&mut inner.write()))
            .await
            .map_err(join_error)?
    }
}

fn join_error(err: tokio::task::JoinError) -> StoreError {
    StoreError::Database {
        message: format!("store task failed: {}", err),
    }
}

#[async_trait]
impl<S> StatsStore for BlockingStoreAdapter<S>
where
    S: EventStoreApi + Send + Sync + 'static,
{
    async fn record(&self, identity: &Identity) -> Result<RecordId, StoreError> {
        let identity = identity.clone();
        self.write(move |store| store.insert(&identity)).await
    }

    async fn count(&self, identity: &Identity) -> Result<u64, StoreError> {
        let identity = identity.clone();
        self.read(move |store| store.count_by_identity(&identity))
            .await
    }

    async fn distinct_count(&self) -> Result<u64, StoreError> {
        self.read(|store| store.distinct_identities().map(|set| set.len() as u64))
            .await
    }

    async fn anonymize(&self, identity: &Identity) -> Result<u64, StoreError> {
        let identity = identity.clone();
        self.write(move |store| store.anonymize(&identity)).await
    }

    async fn erase(&self, identity: &Identity) -> Result<u64, StoreError> {
        let identity = identity.clone();
        self.write(move |store| store.delete_all(&identity)).await
    }

    async fn total_records(&self) -> Result<u64, StoreError> {
        self.read(|store| store.total_records()).await
    }
}

/// Connection slot for the Event Store.
///
/// Starts empty; the node's connector attaches a store once it opens.
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct StoreHandle {
    slot: Arc<RwLock<Option<Arc<dyn StatsStore>>>>,
}

impl StoreHandle {
    /// A handle with no store attached.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// A handle with `store` already attached.
    pub fn connected(store: Arc<dyn StatsStore>) -> Self {
        let handle = Self::default();
        handle.connect(store);
        handle
    }

    pub fn connect(&self, store: Arc<dyn StatsStore>) {
        *self.slot.write() = Some(store);
        info!("Event store attached");
    }

    /// Detach the store. Returns `false` if none was attached.
    pub fn disconnect(&self) -> bool {
        let was_connected = self.slot.write().take().is_some();
        if was_connected {
            info!("Event store detached");
        }
        was_connected
    }

    pub fn is_available(&self) -> bool {
        self.slot.read().is_some()
    }

    /// The attached store, if any.
    pub fn current(&self) -> Option<Arc<dyn StatsStore>> {
        self.slot.read().clone()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("available", &self.is_available())
            .finish()
    }
}
