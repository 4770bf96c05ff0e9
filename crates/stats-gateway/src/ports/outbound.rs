//! Outbound ports for the statistics gateway.

use async_trait::async_trait;
use stats_store::{Identity, RecordId, StoreError};

/// Async view of the Event Store used by the Statistics Service.
///
/// Production: `BlockingStoreAdapter` over any `EventStoreApi`.
/// Tests substitute recording or failing doubles.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Append one event for `identity`, stamped with the current time.
    async fn record(&self, identity: &Identity) -> Result<RecordId, StoreError>;

    /// Number of non-anonymized events for `identity`.
    async fn count(&self, identity: &Identity) -> Result<u64, StoreError>;

    /// Number of distinct identities currently stored.
    async fn distinct_count(&self) -> Result<u64, StoreError>;

    /// Erase the identity of every matching event; returns the number affected.
    async fn anonymize(&self, identity: &Identity) -> Result<u64, StoreError>;

    /// Delete every matching event; returns the number removed.
    async fn erase(&self, identity: &Identity) -> Result<u64, StoreError>;

    /// Number of stored events, anonymized ones included.
    async fn total_records(&self) -> Result<u64, StoreError>;
}
