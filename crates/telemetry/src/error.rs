//! Telemetry Error Types

use thiserror::Error;

/// Errors raised by the telemetry queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Queue at capacity and the policy rejects new samples
    #[error("Telemetry queue full ({capacity} samples pending)")]
    QueueFull { capacity: usize },
}

/// Errors raised while persisting or streaming samples
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// Writing to a sink failed; the sample stays queued
    #[error("Persistence write to {target} failed: {reason}")]
    WriteFailed { target: String, reason: String },
}

impl PersistenceError {
    /// Build a write failure for the given target
    pub fn write_failed(target: impl Into<String>, reason: impl ToString) -> Self {
        PersistenceError::WriteFailed {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}
