//! # Pulse Gateway Test Suite
//!
//! Cross-crate flows that no single subsystem crate can test alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs       # Credentials, heartbeat and subscriptions over the bus
//!     └── websocket.rs   # Full runtime over real HTTP and WebSocket sockets
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p pg-tests
//! cargo test -p pg-tests integration::websocket::
//! ```

pub mod integration;
