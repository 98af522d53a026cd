//! # Node Runtime Library
//!
//! This library exposes the runtime wiring for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Architectural Patterns
//!
//! - **EDA (Event-Driven Architecture)**: registration, login and heartbeat
//!   reach WebSocket clients only through the event bus
//! - **Hexagonal Architecture**: subsystems are wired through their port traits

pub mod container;
pub mod runtime;

pub use container::{load_env_file, ConfigError, NodeConfig};
pub use runtime::NodeRuntime;
