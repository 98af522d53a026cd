//! Domain layer: pure credential logic.

pub mod config;
pub mod entities;
pub mod errors;
pub mod hashing;
