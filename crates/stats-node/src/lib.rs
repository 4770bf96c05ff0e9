//! # Stats Node
//!
//! Runtime for the IP statistics service.
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`stats-telemetry`)
//! 2. Load configuration (defaults, JSON file, environment)
//! 3. Start the store connector in the background
//! 4. Serve HTTP; `/statistics/*` answers 500 until the store attaches
//! 5. On shutdown, stop the connector and drain the server
//!
//! ## Modules
//!
//! - `container/` - configuration loading and the store connector
//! - `adapters/` - storage backends for the Event Store

#![allow(missing_docs)]

pub mod adapters;
pub mod container;

use anyhow::{Context, Result};
use stats_gateway::{StatsConfig, StatsGatewayService, StoreHandle};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::container::connect_with_retry;

/// The node runtime: one gateway plus the connector feeding its store handle.
pub struct StatsNode {
    config: StatsConfig,
    gateway: StatsGatewayService,
    store: StoreHandle,
}

impl StatsNode {
    /// Create a node with a disconnected store.
    pub fn new(config: StatsConfig) -> Result<Self> {
        let store = StoreHandle::disconnected();
        let gateway = StatsGatewayService::new(config.clone(), store.clone())
            .context("Failed to create HTTP gateway")?;
        Ok(Self {
            config,
            gateway,
            store,
        })
    }

    /// Bind the configured address and run until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.run_on(listener, shutdown).await
    }

    /// Run on an already bound listener until `shutdown` resolves.
    pub async fn run_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("===========================================");
        info!("  IP Statistics Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            backend = ?self.config.store.backend,
            data_dir = %self.config.store.data_dir.display(),
            database = %self.config.store.database,
            "Event store configuration"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connector = tokio::spawn(connect_with_retry(
            self.store.clone(),
            self.config.store.clone(),
            shutdown_rx,
        ));

        let result = self
            .gateway
            .serve(listener, async move {
                shutdown.await;
                info!("Initiating graceful shutdown...");
                let _ = shutdown_tx.send(true);
            })
            .await;

        connector.abort();
        self.store.disconnect();
        info!("Shutdown complete");

        result.context("HTTP server failed")
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn store(&self) -> StoreHandle {
        self.store.clone()
    }
}
