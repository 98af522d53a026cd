//! # API Gateway (PG-03)
//!
//! External boundary of the gateway: JSON-RPC 2.0 over HTTP for `login`,
//! `register` and the demo queries, plus WebSocket subscriptions that relay
//! event bus topics to connected clients.
//!
//! # Architecture
//!
//! ```text
//!            POST /          GET /ws         GET /health, /metrics
//!               │               │                    │
//!  ┌────────────┴───────────────┴────────────────────┴──────────┐
//!  │        Middleware: Tracing → CORS → Body limit             │
//!  └────────────┬───────────────┬───────────────────────────────┘
//!               │               │
//!          RpcHandlers   WebSocketHandler ── SubscriptionManager
//!               │                                   │
//!        pg-01 credentials                     Event Bus
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pg_03_api_gateway::{ApiGatewayService, GatewayConfig};
//!
//! let service = ApiGatewayService::new(config, credentials.clone(), credentials, bus)?;
//! service.serve(shutdown_rx).await?;
//! ```
//!
//! # Security
//!
//! - Request body and batch size limits
//! - Per-connection subscription, message size and message rate limits
//! - Authentication failures never reveal whether the username exists

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod rpc;
pub mod service;
pub mod ws;

// Re-exports
pub use domain::config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig, WebSocketConfig};
pub use domain::error::{codes, ApiError, ApiResult, GatewayError};
pub use middleware::GatewayMetrics;
pub use service::ApiGatewayService;
pub use ws::{SubscribeError, SubscriptionManager, SubscriptionNotification};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
