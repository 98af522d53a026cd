//! Domain types for the API Gateway.
//!
//! Configuration, error shape and request types. No I/O.

pub mod config;
pub mod correlation;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig};
pub use correlation::ConnectionId;
pub use error::{ApiError, ApiResult, GatewayError};
pub use types::*;
