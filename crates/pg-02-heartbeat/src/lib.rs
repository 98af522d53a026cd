//! # Heartbeat Subsystem
//!
//! Publishes a `ping` event carrying the current timestamp on a fixed
//! period, independent of client activity.
//!
//! ## Behavior
//!
//! - Fixed period (default 3s), no jitter, no backoff
//! - First ping one full period after start
//! - Timestamps are strictly increasing even if the wall clock stalls or
//!   steps back
//! - Runs until its shutdown signal fires; the task holds nothing that keeps
//!   the process alive once stopped

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod emitter;
pub mod error;

pub use config::HeartbeatConfig;
pub use emitter::{HeartbeatHandle, PingEmitter};
pub use error::HeartbeatError;
