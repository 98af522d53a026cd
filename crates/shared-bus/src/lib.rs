//! # Shared Bus - Event Bus for Producer/Consumer Decoupling
//!
//! Producers (registration, heartbeat, login) publish through the bus and
//! consumers (the WebSocket subscription gateway) read through it. Neither
//! side holds a reference to the other.
//!
//! ## Architecture Rules
//!
//! - All event traffic goes through the Shared Bus ONLY
//! - Topics are a fixed set known at startup (`EventTopic`)
//! - Delivery is fire-and-forget: no durability, no replay
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Producer    │                    │  Subscriber  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │ (per topic)  │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery Guarantees
//!
//! - An event reaches every subscription attached to its topic at the instant
//!   of publication; later subscribers never see it.
//! - Per topic, each subscriber observes events in publish order.
//! - Each subscriber has its own bounded queue. A subscriber that falls more
//!   than the queue depth behind loses the oldest events; publishers and
//!   other subscribers are never blocked by it.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventTopic, GatewayEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
