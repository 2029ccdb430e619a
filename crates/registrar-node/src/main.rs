//! # Domain Registrar Node
//!
//! Entry point: telemetry, configuration, node start, Ctrl+C, shutdown.

use anyhow::{Context, Result};
use registrar_node::{NodeConfig, RegistrarNode};
use registrar_telemetry::{init_telemetry, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and metrics
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    // Load configuration
    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Create and start the node
    let mut node = RegistrarNode::new(config).context("Failed to create registrar node")?;
    node.start().await.context("Failed to start registrar node")?;

    // Keep the node running
    info!("Registrar node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    node.shutdown().await.context("Shutdown failed")?;

    Ok(())
}
