//! # Event Store Flows
//!
//! The Event Store exercised through the gateway's async adapter, over the
//! in-memory backend and RocksDB.

#[cfg(test)]
mod tests {
    use stats_gateway::{BlockingStoreAdapter, StatsStore};
    use stats_node::adapters::storage::{RocksDbConfig, RocksDbStore};
    use stats_store::{
        EventStoreApi, EventStoreService, FixedTimeSource, Identity, InMemoryKVStore,
        SystemTimeSource,
    };
    use std::sync::Arc;

    fn identity(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_anonymize_preserves_timestamps() {
        let clock = FixedTimeSource::new(1_700_000_000_000);
        let adapter = BlockingStoreAdapter::new(EventStoreService::new(
            InMemoryKVStore::new(),
            clock,
        ));
        let a = identity("10.0.0.1");

        let first = adapter.record(&a).await.unwrap();
        {
            let inner = adapter.inner();
            inner.read().time_source().advance(60_000);
        }
        let second = adapter.record(&a).await.unwrap();

        assert_eq!(adapter.anonymize(&a).await.unwrap(), 2);

        let inner = adapter.inner();
        let store = inner.read();
        let first = store.get_record(first).unwrap().unwrap();
        let second = store.get_record(second).unwrap().unwrap();
        assert!(first.is_anonymized());
        assert!(second.is_anonymized());
        assert_eq!(first.timestamp(), 1_700_000_000_000);
        assert_eq!(second.timestamp(), 1_700_000_060_000);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_all_counted() {
        let adapter = Arc::new(BlockingStoreAdapter::new(EventStoreService::new_in_memory()));
        let a = identity("10.0.0.1");

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let adapter = Arc::clone(&adapter);
                let a = a.clone();
                tokio::spawn(async move { adapter.record(&a).await })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(ids.len(), 16);
        assert_eq!(adapter.count(&a).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn test_rocksdb_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let kv = RocksDbStore::open(RocksDbConfig::for_testing(dir.path(), "logs")).unwrap();
        let adapter = BlockingStoreAdapter::new(EventStoreService::new(kv, SystemTimeSource));
        let (a, b) = (identity("10.0.0.1"), identity("10.0.0.2"));

        for _ in 0..3 {
            adapter.record(&a).await.unwrap();
        }
        for _ in 0..2 {
            adapter.record(&b).await.unwrap();
        }

        assert_eq!(adapter.count(&a).await.unwrap(), 3);
        assert_eq!(adapter.distinct_count().await.unwrap(), 2);

        assert_eq!(adapter.anonymize(&a).await.unwrap(), 3);
        assert_eq!(adapter.count(&a).await.unwrap(), 0);
        assert_eq!(adapter.total_records().await.unwrap(), 5);

        assert_eq!(adapter.erase(&b).await.unwrap(), 2);
        assert_eq!(adapter.total_records().await.unwrap(), 3);
        assert_eq!(adapter.distinct_count().await.unwrap(), 0);
    }
}
