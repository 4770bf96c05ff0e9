//! # HTTP Integration Flows
//!
//! Drives the full router (CORS, tracing, availability gate, handlers and
//! the Statistics Service over an in-memory Event Store) one request at a
//! time.
//!
//! ## Flows Tested:
//!
//! 1. Log, count, distinct, anonymize, delete across two clients
//! 2. Admission control: 35 per window, then 429 with `Retry-After`
//! 3. Requests without a client address
//! 4. Store attach after startup
//! 5. Forwarded headers and address canonicalisation
//! 6. CORS and request ids

#[cfg(test)]
mod tests {
    use crate::fixtures::{
        body_bytes, body_json, default_router, delete, get, memory_store, post, router_with,
    };
    use axum::http::{header, StatusCode};
    use stats_gateway::{
        BlockingStoreAdapter, CountResponse, ErrorBody, HealthResponse, StatsConfig, StoreHandle,
    };
    use stats_store::EventStoreService;
    use std::sync::Arc;
    use tower::ServiceExt;

    // =============================================================================
    // STATISTICS LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_end_to_end_statistics_flow() {
        let (router, store) = default_router();

        for _ in 0..3 {
            let response = router
                .clone()
                .oneshot(post("/statistics/add").peer("10.0.0.1").build())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(post("/statistics/add").peer("10.0.0.2").build())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = router
            .clone()
            .oneshot(get("/statistics/count").peer("10.0.0.1").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 3);

        let response = router
            .clone()
            .oneshot(get("/statistics/distinct").peer("10.0.0.1").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 2);

        // Anonymize keeps the events but detaches them from 10.0.0.1
        let response = router
            .clone()
            .oneshot(post("/statistics/anonymize").peer("10.0.0.1").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());

        let response = router
            .clone()
            .oneshot(get("/statistics/count").peer("10.0.0.1").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 0);

        let backend = store.current().unwrap();
        assert_eq!(backend.total_records().await.unwrap(), 5);

        // Delete removes 10.0.0.2's events outright
        let response = router
            .clone()
            .oneshot(delete("/statistics/delete").peer("10.0.0.2").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(backend.total_records().await.unwrap(), 3);

        let response = router
            .oneshot(get("/statistics/distinct").peer("10.0.0.2").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 0);
    }

    #[tokio::test]
    async fn test_repeated_privacy_operations_are_noops() {
        let (router, store) = default_router();
        router
            .clone()
            .oneshot(post("/statistics/add").peer("10.0.0.3").build())
            .await
            .unwrap();

        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(post("/statistics/anonymize").peer("10.0.0.3").build())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        for _ in 0..2 {
            let response = router
                .clone()
                .oneshot(delete("/statistics/delete").peer("10.0.0.3").build())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // The anonymized event is no longer reachable by its former address
        assert_eq!(store.current().unwrap().total_records().await.unwrap(), 1);
    }

    // =============================================================================
    // ADMISSION CONTROL
    // =============================================================================

    #[tokio::test]
    async fn test_thirty_sixth_request_is_rejected() {
        let (router, _store) = default_router();

        for i in 0..35u32 {
            let response = router
                .clone()
                .oneshot(get("/statistics/count").peer("192.0.2.10").build())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()["x-ratelimit-remaining"],
                (34 - i).to_string().as_str()
            );
        }

        let response = router
            .clone()
            .oneshot(post("/statistics/add").peer("192.0.2.10").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry_after: u64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=300).contains(&retry_after));

        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.error, "rate_limited");

        // Another client is unaffected
        let response = router
            .oneshot(get("/statistics/count").peer("192.0.2.11").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejected_add_does_not_write() {
        let mut config = StatsConfig::default();
        config.rate_limit.max_requests = 1;
        let store = memory_store();
        let router = router_with(store.clone(), &config);

        let first = router
            .clone()
            .oneshot(post("/statistics/add").peer("192.0.2.20").build())
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router
            .oneshot(post("/statistics/add").peer("192.0.2.20").build())
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(store.current().unwrap().total_records().await.unwrap(), 1);
    }

    // =============================================================================
    // MISSING IDENTITY
    // =============================================================================

    #[tokio::test]
    async fn test_requests_without_address_are_rejected() {
        let (router, store) = default_router();

        for request in [
            post("/statistics/add").build(),
            post("/statistics/anonymize").build(),
            delete("/statistics/delete").build(),
            get("/statistics/count").build(),
        ] {
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body: ErrorBody = body_json(response).await;
            assert_eq!(
                body.message,
                "The server could not determine your IP address"
            );
        }
        assert_eq!(store.current().unwrap().total_records().await.unwrap(), 0);

        // Distinct is a global aggregate and needs no address
        let response = router
            .oneshot(get("/statistics/distinct").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // =============================================================================
    // STORE AVAILABILITY
    // =============================================================================

    #[tokio::test]
    async fn test_store_attaches_after_startup() {
        let store = StoreHandle::disconnected();
        let router = router_with(store.clone(), &StatsConfig::default());

        let response = router
            .clone()
            .oneshot(post("/statistics/add").peer("10.0.0.1").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = body_json(response).await;
        assert_eq!(body.message, "Database is not running, sorry!");

        let response = router
            .clone()
            .oneshot(get("/health").build())
            .await
            .unwrap();
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "degraded");

        store.connect(Arc::new(BlockingStoreAdapter::new(
            EventStoreService::new_in_memory(),
        )));

        let response = router
            .clone()
            .oneshot(post("/statistics/add").peer("10.0.0.1").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(get("/health").build()).await.unwrap();
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
        assert!(health.store);
    }

    #[tokio::test]
    async fn test_unavailable_store_wins_over_missing_identity() {
        let router = router_with(StoreHandle::disconnected(), &StatsConfig::default());
        let response = router
            .oneshot(post("/statistics/add").build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // =============================================================================
    // IDENTITY RESOLUTION
    // =============================================================================

    #[tokio::test]
    async fn test_forwarded_header_from_untrusted_peer_is_ignored() {
        let (router, _store) = default_router();

        router
            .clone()
            .oneshot(
                post("/statistics/add")
                    .peer("203.0.113.9")
                    .header("x-forwarded-for", "10.0.0.1")
                    .build(),
            )
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(get("/statistics/count").peer("10.0.0.1").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 0);

        let response = router
            .oneshot(get("/statistics/count").peer("203.0.113.9").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 1);
    }

    #[tokio::test]
    async fn test_forwarded_header_from_local_proxy_is_used() {
        let (router, _store) = default_router();

        router
            .clone()
            .oneshot(
                post("/statistics/add")
                    .peer("127.0.0.1")
                    .header("x-forwarded-for", "198.51.100.7")
                    .build(),
            )
            .await
            .unwrap();

        let response = router
            .oneshot(get("/statistics/count").peer("198.51.100.7").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 1);
    }

    #[tokio::test]
    async fn test_mapped_ipv6_peer_shares_identity_with_ipv4() {
        let (router, _store) = default_router();

        router
            .clone()
            .oneshot(post("/statistics/add").peer("::ffff:10.0.0.9").build())
            .await
            .unwrap();

        let response = router
            .oneshot(get("/statistics/count").peer("10.0.0.9").build())
            .await
            .unwrap();
        let body: CountResponse = body_json(response).await;
        assert_eq!(body.count, 1);
    }

    // =============================================================================
    // CORS AND REQUEST IDS
    // =============================================================================

    #[tokio::test]
    async fn test_cors_mirrors_origin() {
        let (router, _store) = default_router();

        let response = router
            .clone()
            .oneshot(
                get("/statistics/distinct")
                    .peer("10.0.0.1")
                    .header("origin", "https://dashboard.example")
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://dashboard.example"
        );

        let preflight = router
            .oneshot(
                crate::fixtures::RequestBuilder::new(
                    axum::http::Method::OPTIONS,
                    "/statistics/delete",
                )
                .header("origin", "https://dashboard.example")
                .header("access-control-request-method", "DELETE")
                .build(),
            )
            .await
            .unwrap();
        assert!(preflight.status().is_success());
        assert_eq!(
            preflight.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://dashboard.example"
        );
    }

    #[tokio::test]
    async fn test_request_id_is_echoed_or_generated() {
        let (router, _store) = default_router();

        let response = router
            .clone()
            .oneshot(get("/health").header("x-request-id", "trace-123").build())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "trace-123");

        let response = router.oneshot(get("/health").build()).await.unwrap();
        assert!(!response.headers()["x-request-id"].is_empty());
    }
}
