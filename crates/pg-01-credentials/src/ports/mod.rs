//! Ports layer: trait seams into and out of the subsystem.

pub mod inbound;
pub mod outbound;
