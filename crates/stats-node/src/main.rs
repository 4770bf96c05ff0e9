//! # IP Statistics Node
//!
//! Binary entry point. See the library docs for the startup sequence.

use anyhow::{Context, Result};
use stats_node::container::load_config;
use stats_node::StatsNode;
use stats_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize logging")?;

    let config = load_config(|key| std::env::var(key).ok())?;
    let node = StatsNode::new(config)?;

    info!("Node is starting. Press Ctrl+C to stop.");
    node.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
}
