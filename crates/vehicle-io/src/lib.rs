//! Vehicle I/O Capabilities
//!
//! The control loop never touches pins directly. It reads pedals and
//! switches through [`SensorInput`], drives lamps and the speed servo
//! through [`ActuatorOutput`] and writes the two-line dashboard through
//! [`TextDisplay`]. [`SimulatedPanel`] and [`LineDisplay`] are in-memory
//! implementations used by the simulator and the tests.

mod capability;
mod channel;
mod display;
mod error;
mod panel;

pub use capability::{ActuatorOutput, SensorInput, TextDisplay};
pub use channel::{AnalogInput, AnalogOutput, DigitalInput, DigitalOutput};
pub use display::{LineDisplay, DISPLAY_COLS, DISPLAY_ROWS};
pub use error::IoError;
pub use panel::{PanelInputs, PanelOutputs, SimulatedPanel};
