//! Simulator Error Types

use task_scheduler::SchedulerError;
use telemetry::{PersistenceError, QueueError};
use thiserror::Error;
use vehicle_io::IoError;

/// Errors while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure of a task cycle or of simulator setup.
///
/// Task cycles only ever return the first three kinds. Sensor and actuator
/// failures skip the cycle, `QueueFull` drops the sample, persistence
/// failures leave samples queued for the next consumer cycle.
#[derive(Debug, Error)]
pub enum VehicleError {
    /// `SensorUnavailable` or `ActuatorWriteFailed`
    #[error(transparent)]
    Io(#[from] IoError),

    /// `QueueFull`
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// `PersistenceWriteFailed`
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Metrics exporter setup failed: {0}")]
    Metrics(String),
}
