//! Simulated instrument panel
//!
//! Stands in for the pedal potentiometers, switches, lamps and servo.
//! Inputs are set by the caller, outputs are recorded for inspection and
//! any channel can be made to fail on demand.

use crate::capability::{ActuatorOutput, SensorInput};
use crate::channel::{AnalogInput, AnalogOutput, DigitalInput, DigitalOutput};
use crate::error::IoError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{info, trace};

/// Positions of the simulated pedals and switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelInputs {
    /// Accelerator pedal position [0, 1]
    pub accelerator: f64,
    /// Brake pedal position [0, 1]
    pub brake: f64,
    pub engine: bool,
    pub side_light: bool,
    pub left_indicator: bool,
    pub right_indicator: bool,
}

/// Last values written to each simulated output
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanelOutputs {
    pub engine_light: bool,
    pub side_light: bool,
    pub left_indicator: bool,
    pub right_indicator: bool,
    pub overspeed_warning: bool,
    /// Servo position [0, 1]
    pub speed_servo: f64,
    /// Number of successful writes across all outputs
    pub writes: u64,
}

/// In-memory sensor and actuator panel
#[derive(Debug, Default)]
pub struct SimulatedPanel {
    inputs: Mutex<PanelInputs>,
    outputs: Mutex<PanelOutputs>,
    /// Channel names that currently fail
    faults: Mutex<HashSet<&'static str>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedPanel {
    /// Create a panel with everything off and pedals released
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a panel with the given initial inputs
    pub fn with_inputs(inputs: PanelInputs) -> Self {
        info!("Creating simulated panel with inputs: {:?}", inputs);
        let panel = Self::default();
        panel.set_inputs(inputs);
        panel
    }

    /// Replace all inputs at once
    pub fn set_inputs(&self, inputs: PanelInputs) {
        *lock(&self.inputs) = PanelInputs {
            accelerator: inputs.accelerator.clamp(0.0, 1.0),
            brake: inputs.brake.clamp(0.0, 1.0),
            ..inputs
        };
    }

    /// Current input positions
    pub fn inputs(&self) -> PanelInputs {
        *lock(&self.inputs)
    }

    /// Set both pedal positions, clamped to [0, 1]
    pub fn set_pedals(&self, accelerator: f64, brake: f64) {
        let mut inputs = lock(&self.inputs);
        inputs.accelerator = accelerator.clamp(0.0, 1.0);
        inputs.brake = brake.clamp(0.0, 1.0);
    }

    /// Set a single switch
    pub fn set_switch(&self, channel: DigitalInput, on: bool) {
        let mut inputs = lock(&self.inputs);
        match channel {
            DigitalInput::Engine => inputs.engine = on,
            DigitalInput::SideLight => inputs.side_light = on,
            DigitalInput::LeftIndicator => inputs.left_indicator = on,
            DigitalInput::RightIndicator => inputs.right_indicator = on,
        }
    }

    /// Snapshot of the outputs
    pub fn outputs(&self) -> PanelOutputs {
        *lock(&self.outputs)
    }

    /// Make reads or writes on the named channel fail
    pub fn inject_fault(&self, channel: &'static str) {
        info!("Injecting fault on channel {}", channel);
        lock(&self.faults).insert(channel);
    }

    /// Restore every channel
    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    fn is_faulty(&self, channel: &'static str) -> bool {
        lock(&self.faults).contains(channel)
    }
}

impl SensorInput for SimulatedPanel {
    fn read_normalized(&self, channel: AnalogInput) -> Result<f64, IoError> {
        if self.is_faulty(channel.name()) {
            return Err(IoError::SensorUnavailable {
                channel: channel.name(),
            });
        }
        let inputs = lock(&self.inputs);
        Ok(match channel {
            AnalogInput::Accelerator => inputs.accelerator,
            AnalogInput::Brake => inputs.brake,
        })
    }

    fn read_digital(&self, channel: DigitalInput) -> Result<bool, IoError> {
        if self.is_faulty(channel.name()) {
            return Err(IoError::SensorUnavailable {
                channel: channel.name(),
            });
        }
        let inputs = lock(&self.inputs);
        Ok(match channel {
            DigitalInput::Engine => inputs.engine,
            DigitalInput::SideLight => inputs.side_light,
            DigitalInput::LeftIndicator => inputs.left_indicator,
            DigitalInput::RightIndicator => inputs.right_indicator,
        })
    }
}

impl ActuatorOutput for SimulatedPanel {
    fn write_digital(&self, channel: DigitalOutput, value: bool) -> Result<(), IoError> {
        if self.is_faulty(channel.name()) {
            return Err(IoError::ActuatorWriteFailed {
                channel: channel.name(),
            });
        }
        trace!("{} <- {}", channel, value);
        let mut outputs = lock(&self.outputs);
        match channel {
            DigitalOutput::EngineLight => outputs.engine_light = value,
            DigitalOutput::SideLight => outputs.side_light = value,
            DigitalOutput::LeftIndicator => outputs.left_indicator = value,
            DigitalOutput::RightIndicator => outputs.right_indicator = value,
            DigitalOutput::OverspeedWarning => outputs.overspeed_warning = value,
        }
        outputs.writes += 1;
        Ok(())
    }

    fn write_analog(&self, channel: AnalogOutput, value: f64) -> Result<(), IoError> {
        if self.is_faulty(channel.name()) {
            return Err(IoError::ActuatorWriteFailed {
                channel: channel.name(),
            });
        }
        trace!("{} <- {:.3}", channel, value);
        let mut outputs = lock(&self.outputs);
        match channel {
            AnalogOutput::SpeedServo => outputs.speed_servo = value.clamp(0.0, 1.0),
        }
        outputs.writes += 1;
        Ok(())
    }
}
