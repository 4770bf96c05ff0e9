//! # Event Store Service
//!
//! `EventStoreService` implements `EventStoreApi` over any `KeyValueStore`.
//! Every mutation is staged into one batch and committed with a single
//! `atomic_batch_write`, so a failed call leaves the store unchanged.

mod store;

use crate::adapters::infra::SystemTimeSource;
use crate::adapters::storage::InMemoryKVStore;
use crate::domain::entities::{EventRecord, RecordId};
use crate::domain::errors::StoreError;
use crate::domain::keys::KeyPrefix;
use crate::ports::outbound::{KeyValueStore, TimeSource};

/// First id handed out by an empty store.
pub const FIRST_RECORD_ID: RecordId = 1;

/// The Event Store service.
pub struct EventStoreService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    /// Key-value store for persistence.
    pub(crate) kv_store: KV,
    /// Clock used to stamp new records.
    pub(crate) time_source: TS,
}

impl<KV, TS> EventStoreService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    pub fn new(kv_store: KV, time_source: TS) -> Self {
        Self {
            kv_store,
            time_source,
        }
    }

    pub fn kv_store(&self) -> &KV {
        &self.kv_store
    }

    pub fn time_source(&self) -> &TS {
        &self.time_source
    }

    pub(crate) fn next_record_id(&self) -> Result<RecordId, StoreError> {
        match self.kv_store.get(&KeyPrefix::next_id_key())? {
            None => Ok(FIRST_RECORD_ID),
            Some(bytes) => {
                let raw: [u8; 8] =
                    bytes
                        .as_slice()
                        .try_into()
                        .map_err(|_| StoreError::Serialization {
                            message: format!("next_id counter has {} bytes", bytes.len()),
                        })?;
                Ok(RecordId::from_be_bytes(raw))
            }
        }
    }

    pub(crate) fn load_record(&self, id: RecordId) -> Result<Option<EventRecord>, StoreError> {
        match self.kv_store.get(&KeyPrefix::event_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
        }
    }
}

impl EventStoreService<InMemoryKVStore, SystemTimeSource> {
    /// Store backed by memory and the system clock.
    pub fn new_in_memory() -> Self {
        Self::new(InMemoryKVStore::new(), SystemTimeSource)
    }
}

pub(crate) fn encode_record(record: &EventRecord) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(record)?)
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<EventRecord, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}
