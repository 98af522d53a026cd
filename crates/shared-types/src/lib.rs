//! # Shared Types Crate
//!
//! This crate contains the entities that travel between subsystems: user
//! records produced by the credential subsystem, the liveness payload produced
//! by the heartbeat, and the success tokens returned at the API boundary.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **No Secrets on the Wire**: `UserRecord` serialises without its secret
//!   hash; raw secrets never appear in any type in this crate.

pub mod entities;

pub use entities::*;
