//! HTTP routes for the statistics endpoints.
//!
//! | Method | Path                    | Success             |
//! |--------|-------------------------|---------------------|
//! | GET    | `/statistics/count`     | `{"count": n}`      |
//! | GET    | `/statistics/distinct`  | `{"count": n}`      |
//! | POST   | `/statistics/add`       | 200, empty body     |
//! | POST   | `/statistics/anonymize` | 200, empty body     |
//! | DELETE | `/statistics/delete`    | 200, empty body     |
//! | GET    | `/health`               | store liveness      |
//! | GET    | `/metrics`              | request counters    |

use crate::adapters::StoreHandle;
use crate::domain::config::StatsConfig;
use crate::domain::error::StatsResult;
use crate::middleware::{
    create_cors_layer, RequestOrigin, StatsMetrics, StoreAvailabilityLayer, TracingLayer,
};
use crate::middleware::rate_limit::Quota;
use crate::statistics::{Admitted, StatisticsService};
use axum::{
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;

pub static RATE_LIMIT_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static RATE_LIMIT_REMAINING_HEADER: HeaderName =
    HeaderName::from_static("x-ratelimit-remaining");

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub statistics: Arc<StatisticsService>,
    pub store: StoreHandle,
    pub metrics: Arc<StatsMetrics>,
}

impl AppState {
    pub fn new(statistics: Arc<StatisticsService>) -> Self {
        Self {
            store: statistics.store().clone(),
            metrics: statistics.metrics(),
            statistics,
        }
    }
}

/// Body of the count endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Body of `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: bool,
}

/// Build the full router: statistics group, health and metrics.
pub fn build_router(state: AppState, config: &StatsConfig) -> Router {
    let statistics = Router::new()
        .route("/count", get(handle_count))
        .route("/distinct", get(handle_distinct))
        .route("/add", post(handle_add))
        .route("/anonymize", post(handle_anonymize))
        .route("/delete", delete(handle_delete))
        .route_layer(StoreAvailabilityLayer::new(
            state.store.clone(),
            Arc::clone(&state.metrics),
        ));

    let middleware = ServiceBuilder::new()
        .layer(create_cors_layer(&config.cors))
        .layer(TracingLayer::new());

    Router::new()
        .nest("/statistics", statistics)
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_snapshot))
        .layer(middleware)
        .with_state(state)
}

async fn handle_count(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> StatsResult<Response> {
    let admitted = state.statistics.count(&origin).await?;
    Ok(count_response(admitted))
}

async fn handle_distinct(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> StatsResult<Response> {
    let admitted = state.statistics.distinct_count(&origin).await?;
    Ok(count_response(admitted))
}

async fn handle_add(State(state): State<AppState>, origin: RequestOrigin) -> StatsResult<Response> {
    let admitted = state.statistics.record(&origin).await?;
    Ok(ack_response(admitted))
}

async fn handle_anonymize(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> StatsResult<Response> {
    let admitted = state.statistics.anonymize(&origin).await?;
    Ok(ack_response(admitted))
}

async fn handle_delete(
    State(state): State<AppState>,
    origin: RequestOrigin,
) -> StatsResult<Response> {
    let admitted = state.statistics.erase(&origin).await?;
    Ok(ack_response(admitted))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.store.is_available();
    Json(HealthResponse {
        status: if store { "ok" } else { "degraded" }.to_string(),
        store,
    })
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut body = state.metrics.to_json();
    if let Some(fields) = body.as_object_mut() {
        fields.insert(
            "admission_windows".to_string(),
            serde_json::json!(state.statistics.admission().tracked_keys()),
        );
    }
    Json(body)
}

fn count_response(admitted: Admitted<u64>) -> Response {
    let response = Json(CountResponse {
        count: admitted.value,
    })
    .into_response();
    with_quota(response, admitted.quota)
}

fn ack_response(admitted: Admitted<()>) -> Response {
    with_quota(StatusCode::OK.into_response(), admitted.quota)
}

fn with_quota(mut response: Response, quota: Option<Quota>) -> Response {
    if let Some(quota) = quota {
        let headers = response.headers_mut();
        headers.insert(
            RATE_LIMIT_LIMIT_HEADER.clone(),
            HeaderValue::from(quota.limit),
        );
        headers.insert(
            RATE_LIMIT_REMAINING_HEADER.clone(),
            HeaderValue::from(quota.remaining),
        );
    }
    response
}
