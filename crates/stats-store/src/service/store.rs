//! # Event Store API Implementation

use super::*;
use crate::domain::entities::{Identity, Timestamp};
use crate::ports::inbound::EventStoreApi;
use crate::ports::outbound::BatchOperation;
use std::collections::BTreeSet;

impl<KV, TS> EventStoreApi for EventStoreService<KV, TS>
where
    KV: KeyValueStore,
    TS: TimeSource,
{
    fn insert(&mut self, identity: &Identity) -> Result<RecordId, StoreError> {
        let now = self.time_source.now();
        self.insert_at(identity, now)
    }

    fn insert_at(
        &mut self,
        identity: &Identity,
        timestamp: Timestamp,
    ) -> Result<RecordId, StoreError> {
        let id = self.next_record_id()?;
        let next = id.checked_add(1).ok_or_else(|| StoreError::Database {
            message: "record id space exhausted".to_string(),
        })?;

        let record = EventRecord::new(id, identity.clone(), timestamp);
        let operations = vec![
            BatchOperation::put(KeyPrefix::event_key(id), encode_record(&record)?),
            BatchOperation::put(KeyPrefix::identity_key(identity, id), Vec::new()),
            BatchOperation::put(KeyPrefix::next_id_key(), next.to_be_bytes().to_vec()),
        ];
        self.kv_store.atomic_batch_write(operations)?;

        #[cfg(feature = "tracing-log")]
        tracing::debug!(id, %identity, timestamp, "event recorded");

        Ok(id)
    }

    fn count_by_identity(&self, identity: &Identity) -> Result<u64, StoreError> {
        let entries = self
            .kv_store
            .prefix_scan(&KeyPrefix::identity_prefix(identity))?;
        Ok(entries.len() as u64)
    }

    fn distinct_identities(&self) -> Result<BTreeSet<Identity>, StoreError> {
        let entries = self
            .kv_store
            .prefix_scan(KeyPrefix::IdentityIndex.as_bytes())?;

        let mut identities = BTreeSet::new();
        let mut last: Option<Vec<u8>> = None;
        for (key, _) in entries {
            let (raw, _) = KeyPrefix::parse_identity_key(&key)?;
            // Index keys are sorted, so one identity's entries are adjacent.
            if last.as_deref() == Some(raw) {
                continue;
            }
            let text = std::str::from_utf8(raw).map_err(|e| StoreError::Serialization {
                message: e.to_string(),
            })?;
            let identity = Identity::new(text).map_err(|e| StoreError::Serialization {
                message: e.to_string(),
            })?;
            identities.insert(identity);
            last = Some(raw.to_vec());
        }
        Ok(identities)
    }

    fn anonymize(&mut self, identity: &Identity) -> Result<u64, StoreError> {
        let entries = self
            .kv_store
            .prefix_scan(&KeyPrefix::identity_prefix(identity))?;
        if entries.is_empty() {
            return Ok(0);
        }

        let mut operations = Vec::with_capacity(entries.len() * 2);
        for (index_key, _) in entries {
            let (_, id) = KeyPrefix::parse_identity_key(&index_key)?;
            let mut record = self
                .load_record(id)?
                .ok_or(StoreError::DanglingIndex { id })?;
            record.anonymize();
            operations.push(BatchOperation::put(
                KeyPrefix::event_key(id),
                encode_record(&record)?,
            ));
            operations.push(BatchOperation::delete(index_key));
        }

        let affected = (operations.len() / 2) as u64;
        self.kv_store.atomic_batch_write(operations)?;

        #[cfg(feature = "tracing-log")]
        tracing::info!(%identity, affected, "records anonymized");

        Ok(affected)
    }

    fn delete_all(&mut self, identity: &Identity) -> Result<u64, StoreError> {
        let entries = self
            .kv_store
            .prefix_scan(&KeyPrefix::identity_prefix(identity))?;
        if entries.is_empty() {
            return Ok(0);
        }

        let mut operations = Vec::with_capacity(entries.len() * 2);
        let mut affected = 0u64;
        for (index_key, _) in entries {
            let (_, id) = KeyPrefix::parse_identity_key(&index_key)?;
            let record_key = KeyPrefix::event_key(id);
            if self.kv_store.exists(&record_key)? {
                operations.push(BatchOperation::delete(record_key));
                affected += 1;
            } else {
                #[cfg(feature = "tracing-log")]
                tracing::warn!(id, %identity, "dropping dangling index entry");
            }
            operations.push(BatchOperation::delete(index_key));
        }
        self.kv_store.atomic_batch_write(operations)?;

        #[cfg(feature = "tracing-log")]
        tracing::info!(%identity, affected, "records deleted");

        Ok(affected)
    }

    fn total_records(&self) -> Result<u64, StoreError> {
        let entries = self.kv_store.prefix_scan(KeyPrefix::Event.as_bytes())?;
        Ok(entries.len() as u64)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<EventRecord>, StoreError> {
        self.load_record(id)
    }
}
