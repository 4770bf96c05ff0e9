//! Store availability gate.
//!
//! Applied to the `/statistics` routes: while no Event Store is attached,
//! every request is answered with `StoreUnavailable` before any identity or
//! admission work happens.

use crate::adapters::StoreHandle;
use crate::domain::error::StatsError;
use crate::middleware::metrics::StatsMetrics;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

/// Store availability layer
#[derive(Clone)]
pub struct StoreAvailabilityLayer {
    store: StoreHandle,
    metrics: Arc<StatsMetrics>,
}

impl StoreAvailabilityLayer {
    pub fn new(store: StoreHandle, metrics: Arc<StatsMetrics>) -> Self {
        Self { store, metrics }
    }
}

impl<S> Layer<S> for StoreAvailabilityLayer {
    type Service = StoreAvailabilityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        StoreAvailabilityService {
            inner,
            store: self.store.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// Store availability service
#[derive(Clone)]
pub struct StoreAvailabilityService<S> {
    inner: S,
    store: StoreHandle,
    metrics: Arc<StatsMetrics>,
}

impl<S> Service<Request<Body>> for StoreAvailabilityService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if !self.store.is_available() {
            warn!(path = %req.uri().path(), "Rejecting request: event store is not connected");
            let error = StatsError::StoreUnavailable;
            self.metrics.record_error(&error, 0);
            return Box::pin(async move { Ok(error.into_response()) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}
