//! Roomcast gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p roomcast-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use anyhow::Context;
use roomcast_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Tracing may not be up yet when configuration fails
        eprintln!("roomcast-gateway: {e:#}");
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        address = %config.gateway.address(),
        storage = ?config.storage,
        bus = ?config.bus,
        "Configuration loaded"
    );

    roomcast_gateway::run(config).await?;

    Ok(())
}
