//! # Configuration Container
//!
//! Subsystem configuration sections and their environment overrides.

pub mod config;

pub use config::{load_env_file, ConfigError, NodeConfig};
