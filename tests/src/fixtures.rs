//! Shared builders for the integration flows.

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use serde::de::DeserializeOwned;
use stats_gateway::{
    AdmissionController, AppState, BlockingStoreAdapter, IdentityResolver, StatisticsService,
    StatsConfig, StatsMetrics, StoreHandle, TrustedProxyConfig,
};
use stats_store::EventStoreService;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Store handle attached to a fresh in-memory Event Store.
pub fn memory_store() -> StoreHandle {
    StoreHandle::connected(Arc::new(BlockingStoreAdapter::new(
        EventStoreService::new_in_memory(),
    )))
}

/// Router wired the way the gateway service wires it.
pub fn router_with(store: StoreHandle, config: &StatsConfig) -> Router {
    let statistics = Arc::new(StatisticsService::new(
        store,
        Arc::new(AdmissionController::new(config.rate_limit.clone())),
        IdentityResolver::new(TrustedProxyConfig::from(&config.security)),
        Arc::new(StatsMetrics::new()),
    ));
    stats_gateway::build_router(AppState::new(statistics), config)
}

/// Router over a fresh in-memory store with default configuration.
pub fn default_router() -> (Router, StoreHandle) {
    let store = memory_store();
    (router_with(store.clone(), &StatsConfig::default()), store)
}

/// Request builder that records `peer` the way the server's connect-info does.
pub struct RequestBuilder {
    method: Method,
    uri: String,
    peer: Option<IpAddr>,
    headers: Vec<(String, String)>,
}

impl RequestBuilder {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            peer: None,
            headers: Vec::new(),
        }
    }

    pub fn peer(mut self, ip: &str) -> Self {
        self.peer = ip.parse().ok();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut request = builder
            .body(Body::empty())
            .unwrap_or_else(|e| panic!("invalid test request: {}", e));
        if let Some(ip) = self.peer {
            request
                .extensions_mut()
                .insert(ConnectInfo(SocketAddr::new(ip, 50_000)));
        }
        request
    }
}

pub fn get(uri: &str) -> RequestBuilder {
    RequestBuilder::new(Method::GET, uri)
}

pub fn post(uri: &str) -> RequestBuilder {
    RequestBuilder::new(Method::POST, uri)
}

pub fn delete(uri: &str) -> RequestBuilder {
    RequestBuilder::new(Method::DELETE, uri)
}

/// Read a JSON response body.
pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|e| panic!("failed to read body: {}", e));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("body is not the expected JSON: {}", e))
}

/// Read a response body as bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .map(|b| b.to_vec())
        .unwrap_or_else(|e| panic!("failed to read body: {}", e))
}
