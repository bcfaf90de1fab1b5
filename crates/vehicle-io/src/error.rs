//! I/O Error Types

use thiserror::Error;

/// Errors raised by sensor, actuator and display capabilities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// A sensor channel could not be read
    #[error("Sensor {channel} unavailable")]
    SensorUnavailable { channel: &'static str },

    /// An actuator channel rejected a write
    #[error("Actuator write to {channel} failed")]
    ActuatorWriteFailed { channel: &'static str },

    /// Cursor placed outside the display area
    #[error("Display position ({row}, {col}) out of range")]
    DisplayOutOfRange { row: usize, col: usize },
}
