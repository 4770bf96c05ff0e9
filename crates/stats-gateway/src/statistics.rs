//! # Statistics Service
//!
//! Orchestrates one statistics operation:
//!
//! 1. Store availability (`StoreUnavailable`)
//! 2. Identity resolution; a failure is held, not returned yet
//! 3. Admission, keyed by identity or its fallbacks (`RateLimited`)
//! 4. Identity requirement for identity-scoped operations (`NoIdentity`)
//! 5. The store call (`StoreOperationFailed`)
//!
//! Failures at any step leave the store untouched.

use crate::adapters::StoreHandle;
use crate::domain::error::{StatsError, StatsResult};
use crate::middleware::identity::{IdentityResolver, RequestOrigin};
use crate::middleware::metrics::{Operation, RequestTimer, StatsMetrics};
use crate::middleware::rate_limit::{admission_key, AdmissionController, Quota};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of an admitted operation plus the caller's remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted<T> {
    pub value: T,
    /// `None` when admission control did not count the call.
    pub quota: Option<Quota>,
}

impl<T> Admitted<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Admitted<U> {
        Admitted {
            value: f(self.value),
            quota: self.quota,
        }
    }
}

/// The Statistics Service.
pub struct StatisticsService {
    store: StoreHandle,
    admission: Arc<AdmissionController>,
    resolver: IdentityResolver,
    metrics: Arc<StatsMetrics>,
}

impl StatisticsService {
    pub fn new(
        store: StoreHandle,
        admission: Arc<AdmissionController>,
        resolver: IdentityResolver,
        metrics: Arc<StatsMetrics>,
    ) -> Self {
        Self {
            store,
            admission,
            resolver,
            metrics,
        }
    }

    /// Number of events logged for the caller.
    pub async fn count(&self, origin: &RequestOrigin) -> StatsResult<Admitted<u64>> {
        self.execute(Operation::Count, origin).await
    }

    /// Number of distinct identities in the store. Needs no caller identity.
    pub async fn distinct_count(&self, origin: &RequestOrigin) -> StatsResult<Admitted<u64>> {
        self.execute(Operation::DistinctCount, origin).await
    }

    /// Log one event for the caller.
    pub async fn record(&self, origin: &RequestOrigin) -> StatsResult<Admitted<()>> {
        Ok(self.execute(Operation::Record, origin).await?.map(|_| ()))
    }

    /// Erase the caller's identity from all their events.
    pub async fn anonymize(&self, origin: &RequestOrigin) -> StatsResult<Admitted<()>> {
        Ok(self.execute(Operation::Anonymize, origin).await?.map(|_| ()))
    }

    /// Delete all of the caller's events.
    pub async fn erase(&self, origin: &RequestOrigin) -> StatsResult<Admitted<()>> {
        Ok(self.execute(Operation::Erase, origin).await?.map(|_| ()))
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn admission(&self) -> Arc<AdmissionController> {
        Arc::clone(&self.admission)
    }

    pub fn metrics(&self) -> Arc<StatsMetrics> {
        Arc::clone(&self.metrics)
    }

    async fn execute(&self, op: Operation, origin: &RequestOrigin) -> StatsResult<Admitted<u64>> {
        let timer = RequestTimer::new(Arc::clone(&self.metrics));

        match self.run(op, origin).await {
            Ok(admitted) => {
                timer.succeed(op);
                Ok(admitted)
            }
            Err(err) => {
                match &err {
                    StatsError::StoreOperationFailed(cause) => {
                        error!(operation = op.name(), error = %cause, "Store operation failed");
                    }
                    StatsError::RateLimited { retry_after } => {
                        warn!(
                            operation = op.name(),
                            peer = ?origin.peer,
                            retry_after_ms = retry_after.as_millis() as u64,
                            "Rate limit exceeded"
                        );
                    }
                    StatsError::NoIdentity => {
                        warn!(operation = op.name(), "Could not determine client identity");
                    }
                    StatsError::StoreUnavailable => {
                        warn!(operation = op.name(), "Event store is not connected");
                    }
                }
                timer.fail(&err);
                Err(err)
            }
        }
    }

    async fn run(&self, op: Operation, origin: &RequestOrigin) -> StatsResult<Admitted<u64>> {
        let store = self.store.current().ok_or(StatsError::StoreUnavailable)?;

        let identity = self.resolver.resolve(origin);

        let key = admission_key(identity.as_ref().ok(), origin.peer);
        let quota = self
            .admission
            .check(&key)
            .map_err(|retry_after| StatsError::RateLimited { retry_after })?
            .quota();

        // Global aggregates are answered even when the caller is unresolved.
        let identity = if op.requires_identity() {
            Some(identity?)
        } else {
            None
        };

        let value = match (op, identity) {
            (Operation::DistinctCount, _) => store.distinct_count().await?,
            (Operation::Count, Some(identity)) => store.count(&identity).await?,
            (Operation::Record, Some(identity)) => {
                let id = store.record(&identity).await?;
                debug!(id, %identity, "Event recorded");
                1
            }
            (Operation::Anonymize, Some(identity)) => {
                let affected = store.anonymize(&identity).await?;
                info!(%identity, affected, "Records anonymized");
                self.metrics.record_affected(op, affected);
                affected
            }
            (Operation::Erase, Some(identity)) => {
                let affected = store.erase(&identity).await?;
                info!(%identity, affected, "Records deleted");
                self.metrics.record_affected(op, affected);
                affected
            }
            (_, None) => return Err(StatsError::NoIdentity),
        };

        Ok(Admitted { value, quota })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::BlockingStoreAdapter;
    use crate::domain::config::RateLimitConfig;
    use crate::ports::outbound::StatsStore;
    use async_trait::async_trait;
    use axum::http::{HeaderMap, HeaderValue};
    use stats_store::{EventStoreService, Identity, RecordId, StoreError};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store double that counts calls and optionally fails all of them.
    #[derive(Default)]
    struct RecordingStore {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingStore {
        fn touch(&self) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Database {
                    message: "connection reset".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl StatsStore for RecordingStore {
        async fn record(&self, _identity: &Identity) -> Result<RecordId, StoreError> {
            self.touch().map(|_| 1)
        }
        async fn count(&self, _identity: &Identity) -> Result<u64, StoreError> {
            self.touch().map(|_| 0)
        }
        async fn distinct_count(&self) -> Result<u64, StoreError> {
            self.touch().map(|_| 0)
        }
        async fn anonymize(&self, _identity: &Identity) -> Result<u64, StoreError> {
            self.touch().map(|_| 0)
        }
        async fn erase(&self, _identity: &Identity) -> Result<u64, StoreError> {
            self.touch().map(|_| 0)
        }
        async fn total_records(&self) -> Result<u64, StoreError> {
            self.touch().map(|_| 0)
        }
    }

    fn service_with(store: StoreHandle, max_requests: u32) -> StatisticsService {
        let config = RateLimitConfig {
            max_requests,
            window: Duration::from_secs(300),
            ..Default::default()
        };
        StatisticsService::new(
            store,
            Arc::new(AdmissionController::new(config)),
            IdentityResolver::default(),
            Arc::new(StatsMetrics::new()),
        )
    }

    fn from_peer(a: u8, b: u8, c: u8, d: u8) -> RequestOrigin {
        RequestOrigin::new(Some(IpAddr::V4(Ipv4Addr::new(a, b, c, d))), HeaderMap::new())
    }

    fn anonymous() -> RequestOrigin {
        RequestOrigin::default()
    }

    fn in_memory_handle() -> StoreHandle {
        StoreHandle::connected(Arc::new(BlockingStoreAdapter::new(
            EventStoreService::new_in_memory(),
        )))
    }

    #[tokio::test]
    async fn test_unavailable_store_is_checked_first() {
        let service = service_with(StoreHandle::disconnected(), 35);

        let result = service.record(&anonymous()).await;
        assert!(matches!(result, Err(StatsError::StoreUnavailable)));
        // Neither admission nor identity work happened
        assert_eq!(service.admission().tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_no_identity_performs_no_store_call() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(StoreHandle::connected(store.clone()), 35);

        for result in [
            service.record(&anonymous()).await,
            service.anonymize(&anonymous()).await,
            service.erase(&anonymous()).await,
        ] {
            assert!(matches!(result, Err(StatsError::NoIdentity)));
        }
        assert!(matches!(
            service.count(&anonymous()).await,
            Err(StatsError::NoIdentity)
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_distinct_count_needs_no_identity() {
        let service = service_with(in_memory_handle(), 35);
        let admitted = service.distinct_count(&anonymous()).await.unwrap();
        assert_eq!(admitted.value, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_before_store() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(StoreHandle::connected(store.clone()), 35);
        let origin = from_peer(203, 0, 113, 7);

        for i in 0..35u32 {
            let admitted = service.count(&origin).await.unwrap();
            assert_eq!(admitted.quota.unwrap().remaining, 34 - i);
        }
        let result = service.record(&origin).await;
        assert!(matches!(result, Err(StatsError::RateLimited { .. })));
        assert_eq!(store.calls.load(Ordering::SeqCst), 35);
    }

    #[tokio::test]
    async fn test_unresolved_requests_share_a_bucket() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(StoreHandle::connected(store), 2);

        assert!(matches!(
            service.record(&anonymous()).await,
            Err(StatsError::NoIdentity)
        ));
        assert!(service.distinct_count(&anonymous()).await.is_ok());
        assert!(matches!(
            service.distinct_count(&anonymous()).await,
            Err(StatsError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_mapped() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let service = service_with(StoreHandle::connected(store), 35);

        let result = service.record(&from_peer(10, 0, 0, 1)).await;
        assert!(matches!(result, Err(StatsError::StoreOperationFailed(_))));
        assert_eq!(
            service
                .metrics()
                .internal_errors
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_forwarded_identity_from_trusted_proxy() {
        let service = service_with(in_memory_handle(), 35);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("198.51.100.4"));
        let proxied = RequestOrigin::new(Some(IpAddr::V4(Ipv4Addr::LOCALHOST)), headers);

        service.record(&proxied).await.unwrap();
        assert_eq!(service.count(&proxied).await.unwrap().value, 1);
        assert_eq!(
            service
                .count(&from_peer(198, 51, 100, 4))
                .await
                .unwrap()
                .value,
            1
        );
    }

    #[tokio::test]
    async fn test_end_to_end_flow() {
        let service = service_with(in_memory_handle(), 35);
        let a = from_peer(10, 0, 0, 1);
        let b = from_peer(10, 0, 0, 2);

        for _ in 0..3 {
            service.record(&a).await.unwrap();
        }
        for _ in 0..2 {
            service.record(&b).await.unwrap();
        }
        assert_eq!(service.count(&a).await.unwrap().value, 3);
        assert_eq!(service.distinct_count(&a).await.unwrap().value, 2);

        service.anonymize(&a).await.unwrap();
        assert_eq!(service.count(&a).await.unwrap().value, 0);

        service.erase(&b).await.unwrap();
        assert_eq!(service.count(&b).await.unwrap().value, 0);
        assert_eq!(service.distinct_count(&b).await.unwrap().value, 0);

        let store = service.store().current().unwrap();
        assert_eq!(store.total_records().await.unwrap(), 3);
        assert_eq!(
            service
                .metrics()
                .records_anonymized
                .load(std::sync::atomic::Ordering::Relaxed),
            3
        );
    }
}
