use thiserror::Error;

/// Heartbeat errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeartbeatError {
    #[error("Heartbeat interval must be non-zero")]
    ZeroInterval,

    /// The emitter task panicked or was aborted.
    #[error("Heartbeat task failed: {0}")]
    TaskFailed(String),
}
