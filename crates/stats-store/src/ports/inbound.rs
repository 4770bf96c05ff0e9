//! # Inbound Ports (Driving Ports)
//!
//! The primary API of the Event Store.

use crate::domain::entities::{EventRecord, Identity, RecordId, Timestamp};
use crate::domain::errors::StoreError;
use std::collections::BTreeSet;

/// Primary API of the Event Store.
///
/// Reads take `&self`, mutations take `&mut self`; callers sharing a store
/// across threads wrap it in a read/write lock.
pub trait EventStoreApi {
    /// Record one event for `identity`, stamped with the current time.
    fn insert(&mut self, identity: &Identity) -> Result<RecordId, StoreError>;

    /// Record one event with an explicit timestamp.
    fn insert_at(&mut self, identity: &Identity, timestamp: Timestamp)
        -> Result<RecordId, StoreError>;

    /// Number of records whose identity equals `identity`.
    ///
    /// Anonymized records never match.
    fn count_by_identity(&self, identity: &Identity) -> Result<u64, StoreError>;

    /// Every distinct identity currently stored. Anonymized records are skipped.
    fn distinct_identities(&self) -> Result<BTreeSet<Identity>, StoreError>;

    /// Erase the identity of every record matching `identity`.
    ///
    /// Records and timestamps are kept. Returns the number of records
    /// affected; a second call returns 0.
    fn anonymize(&mut self, identity: &Identity) -> Result<u64, StoreError>;

    /// Delete every record matching `identity`. Returns the number removed.
    fn delete_all(&mut self, identity: &Identity) -> Result<u64, StoreError>;

    /// Number of records stored, anonymized ones included.
    fn total_records(&self) -> Result<u64, StoreError>;

    fn get_record(&self, id: RecordId) -> Result<Option<EventRecord>, StoreError>;
}
