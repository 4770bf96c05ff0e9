//! Gateway service - owns configuration, shared state and the HTTP server.

use crate::adapters::StoreHandle;
use crate::domain::config::StatsConfig;
use crate::domain::error::GatewayError;
use crate::middleware::rate_limit::cleanup_task;
use crate::middleware::{AdmissionController, IdentityResolver, StatsMetrics, TrustedProxyConfig};
use crate::router::{build_router, AppState};
use crate::statistics::StatisticsService;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Statistics gateway service
pub struct StatsGatewayService {
    config: StatsConfig,
    statistics: Arc<StatisticsService>,
}

impl StatsGatewayService {
    /// Create a new gateway over `store`, which may still be disconnected.
    pub fn new(config: StatsConfig, store: StoreHandle) -> Result<Self, GatewayError> {
        config
            .validate()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let admission = Arc::new(AdmissionController::new(config.rate_limit.clone()));
        let resolver = IdentityResolver::new(TrustedProxyConfig::from(&config.security));
        let metrics = Arc::new(StatsMetrics::new());
        let statistics = Arc::new(StatisticsService::new(store, admission, resolver, metrics));

        Ok(Self { config, statistics })
    }

    /// Router with all routes and middleware attached
    pub fn router(&self) -> Router {
        build_router(AppState::new(Arc::clone(&self.statistics)), &self.config)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{}: {}", addr, e)))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        info!(addr = %local_addr, "Starting HTTP server");

        let cleanup = tokio::spawn(cleanup_task(
            self.statistics.admission(),
            self.config.rate_limit.cleanup_interval,
        ));

        let app = self.router();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        cleanup.abort();

        match result {
            Ok(()) => {
                info!("HTTP server stopped");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "HTTP server stopped with error");
                Err(GatewayError::Server(e.to_string()))
            }
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn statistics(&self) -> Arc<StatisticsService> {
        Arc::clone(&self.statistics)
    }

    pub fn store(&self) -> StoreHandle {
        self.statistics.store().clone()
    }

    pub fn metrics(&self) -> Arc<StatsMetrics> {
        self.statistics.metrics()
    }
}
