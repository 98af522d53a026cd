//! # Pulse Gateway Node
//!
//! The main entry point for the gateway process.
//!
//! ## Startup Sequence
//!
//! 1. Load the env file (`DOTENV_PATH` or `./.env`)
//! 2. Initialize logging
//! 3. Load and validate configuration
//! 4. Start subsystems and the API server
//! 5. Run until Ctrl+C or until the API server exits

use anyhow::{Context, Result};
use node_runtime::{load_env_file, NodeConfig, NodeRuntime};
use pulse_telemetry::{init_logging, TelemetryConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Before logging, so the file can set the log level.
    let env_file = load_env_file().context("Failed to load env file")?;

    init_logging(&TelemetryConfig::from_env()).context("Failed to initialize logging")?;
    if let Some(path) = env_file {
        info!(path = %path.display(), "Loaded env file");
    }

    let config = NodeConfig::from_env().context("Failed to load configuration")?;

    let mut runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    info!("Gateway is running. Press Ctrl+C to stop.");
    let exited = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            None
        }
        stopped = runtime.stopped() => Some(stopped),
    };

    let shutdown = runtime.shutdown().await;

    if let Some(stopped) = exited {
        if let Err(e) = &stopped {
            error!(error = ?e, "API server exited unexpectedly");
        }
        stopped.context("API server exited unexpectedly")?;
        anyhow::bail!("API server exited without a shutdown signal");
    }

    shutdown
}
