//! Outbound port implementations.

pub mod memory_store;
