//! Clearing House Gateway binary.
//!
//! All settings come from `CH_GATEWAY_*` environment variables; see
//! [`GatewayConfig::from_env`].

use anyhow::{Context, Result};
use ch_gateway::{telemetry, GatewayConfig, GatewayService};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env().context("failed to load configuration")?;

    telemetry::init_logging(&config.logging).context("failed to initialize logging")?;

    config.validate().context("invalid configuration")?;

    info!(
        version = ch_gateway::VERSION,
        environment = ?config.environment,
        connector = %config.identity.connector_id,
        "Starting Clearing House gateway"
    );

    let service = GatewayService::new(config)?;
    service.serve().await?;

    Ok(())
}
