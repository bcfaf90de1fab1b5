//! Shared Vehicle State
//!
//! The mutable state of the simulated car, split into four lock domains
//! (driver inputs, instantaneous speed, average speed, telemetry queue),
//! together with the pure logic each periodic task applies to it: the speed
//! model, the moving-average filter, the overspeed blinker and the
//! indicator/hazard automaton.

mod average;
mod blink;
mod indicator;
mod speed;
mod state;

pub use average::{AverageState, OdometerMode, ODOMETER_TICK_S, OVERSPEED_THRESHOLD};
pub use blink::Blinker;
pub use indicator::{IndicatorLamps, IndicatorMode};
pub use speed::{
    integrate, DriverInputs, SpeedHistory, SpeedState, DYNAMICS_STEP_S, HISTORY_LEN, MAX_SPEED,
};
pub use state::{
    AverageGuard, InputGuard, InputState, LockToken, QueueGuard, SpeedGuard, VehicleSnapshot,
    VehicleState,
};
