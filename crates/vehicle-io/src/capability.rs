//! Capability traits consumed by the control loop

use crate::channel::{AnalogInput, AnalogOutput, DigitalInput, DigitalOutput};
use crate::error::IoError;

/// Read access to pedals and switches.
///
/// Shared between several periodic tasks, so implementations take `&self`
/// and handle their own interior synchronisation.
pub trait SensorInput: Send + Sync {
    /// Read an analog channel as a value in [0, 1]
    fn read_normalized(&self, channel: AnalogInput) -> Result<f64, IoError>;

    /// Read a digital switch
    fn read_digital(&self, channel: DigitalInput) -> Result<bool, IoError>;
}

/// Write access to lamps and the speed servo.
pub trait ActuatorOutput: Send + Sync {
    /// Drive a digital output
    fn write_digital(&self, channel: DigitalOutput, value: bool) -> Result<(), IoError>;

    /// Drive an analog output with a value in [0, 1]
    fn write_analog(&self, channel: AnalogOutput, value: f64) -> Result<(), IoError>;
}

/// Character display addressed by row and column.
pub trait TextDisplay: Send {
    /// Move the cursor
    fn locate(&mut self, row: usize, col: usize);

    /// Print text at the cursor, advancing it
    fn print(&mut self, text: &str) -> Result<(), IoError>;

    /// Blank the display and home the cursor
    fn clear(&mut self);
}
