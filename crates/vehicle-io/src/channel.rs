//! Channel identifiers

use std::fmt;

/// Analog inputs, normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogInput {
    /// Accelerator pedal potentiometer
    Accelerator,
    /// Brake pedal potentiometer
    Brake,
}

/// Digital switch inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalInput {
    Engine,
    SideLight,
    LeftIndicator,
    RightIndicator,
}

/// Digital lamp outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalOutput {
    EngineLight,
    SideLight,
    LeftIndicator,
    RightIndicator,
    /// Flashing warning shown above the speed limit
    OverspeedWarning,
}

/// Analog outputs, normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogOutput {
    /// Needle servo showing the average speed
    SpeedServo,
}

impl AnalogInput {
    /// Stable channel name used in errors and fault injection
    pub fn name(self) -> &'static str {
        match self {
            AnalogInput::Accelerator => "accelerator",
            AnalogInput::Brake => "brake",
        }
    }
}

impl DigitalInput {
    /// Stable channel name used in errors and fault injection
    pub fn name(self) -> &'static str {
        match self {
            DigitalInput::Engine => "engine_switch",
            DigitalInput::SideLight => "side_light_switch",
            DigitalInput::LeftIndicator => "left_indicator_switch",
            DigitalInput::RightIndicator => "right_indicator_switch",
        }
    }
}

impl DigitalOutput {
    /// Stable channel name used in errors and fault injection
    pub fn name(self) -> &'static str {
        match self {
            DigitalOutput::EngineLight => "engine_light",
            DigitalOutput::SideLight => "side_light",
            DigitalOutput::LeftIndicator => "left_indicator",
            DigitalOutput::RightIndicator => "right_indicator",
            DigitalOutput::OverspeedWarning => "overspeed_warning",
        }
    }
}

impl AnalogOutput {
    /// Stable channel name used in errors and fault injection
    pub fn name(self) -> &'static str {
        match self {
            AnalogOutput::SpeedServo => "speed_servo",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        })*
    };
}

display_by_name!(AnalogInput, DigitalInput, DigitalOutput, AnalogOutput);
