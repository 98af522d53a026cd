//! # Pulse Telemetry
//!
//! Structured logging for the gateway binary.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pulse_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PG_LOG_LEVEL` | `RUST_LOG`, then `info` | Log filter |
//! | `PG_JSON_LOGS` | `true` in containers | JSON log lines |
//! | `PG_SERVICE_NAME` | `pulse-gateway` | Service name |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log subscriber: {0}")]
    Init(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
