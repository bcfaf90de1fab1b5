//! Periodic task bodies
//!
//! Each task owns its own [`LockToken`], takes only the locks it needs and
//! releases them before touching actuators or the display. The indicator
//! lamps are the exception: both flash paths write them under the input
//! lock. Sensor reads happen outside the locks. The only two-lock path is the
//! average filter, which takes speed then average through the speed guard.

use crate::error::VehicleError;
use std::sync::Arc;
use task_scheduler::PeriodicTask;
use telemetry::{TelemetrySample, TelemetrySink};
use tracing::{debug, trace};
use vehicle_io::{
    ActuatorOutput, AnalogInput, AnalogOutput, DigitalInput, DigitalOutput, SensorInput,
    TextDisplay, DISPLAY_COLS,
};
use vehicle_state::{IndicatorLamps, LockToken, OdometerMode, VehicleState, MAX_SPEED};

/// Shared handles every task works against
#[derive(Clone)]
pub struct Vehicle {
    pub state: Arc<VehicleState>,
    pub sensors: Arc<dyn SensorInput>,
    pub actuators: Arc<dyn ActuatorOutput>,
}

impl Vehicle {
    pub fn new(
        state: Arc<VehicleState>,
        sensors: Arc<dyn SensorInput>,
        actuators: Arc<dyn ActuatorOutput>,
    ) -> Self {
        Self {
            state,
            sensors,
            actuators,
        }
    }
}

/// Run every step, then report the first failure
fn first_error(
    results: impl IntoIterator<Item = Result<(), VehicleError>>,
) -> Result<(), VehicleError> {
    results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
}

/// Drive both indicator lamps.
///
/// Called with the input lock held, so the lamps always match
/// `InputState::indicators` and the 1 Hz and 2 Hz writers never interleave.
fn write_lamps(actuators: &dyn ActuatorOutput, lamps: IndicatorLamps) -> Result<(), VehicleError> {
    actuators.write_digital(DigitalOutput::LeftIndicator, lamps.left)?;
    actuators.write_digital(DigitalOutput::RightIndicator, lamps.right)?;
    Ok(())
}

/// Integrates the pedals into the instantaneous speed (50 ms)
pub struct Dynamics {
    vehicle: Vehicle,
    token: LockToken,
}

impl Dynamics {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for Dynamics {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let state = &self.vehicle.state;
        let inputs = state.lock_inputs(&mut self.token).driver_inputs();
        let speed = state.lock_speed(&mut self.token).step(inputs);
        trace!("speed = {:.3}", speed);
        metrics::gauge!("vehicle_speed").set(speed);
        Ok(())
    }
}

/// Samples the accelerator and brake pedals (100 ms)
pub struct PedalSampler {
    vehicle: Vehicle,
    token: LockToken,
}

impl PedalSampler {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for PedalSampler {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let sensors = &self.vehicle.sensors;
        let acceleration = sensors.read_normalized(AnalogInput::Accelerator)?;
        let brake = sensors.read_normalized(AnalogInput::Brake)?;

        let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
        inputs.acceleration = acceleration;
        inputs.brake = brake;
        Ok(())
    }
}

/// Samples the engine switch and mirrors it on the engine light (500 ms)
pub struct EngineMonitor {
    vehicle: Vehicle,
    token: LockToken,
}

impl EngineMonitor {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for EngineMonitor {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let engine_on = self.vehicle.sensors.read_digital(DigitalInput::Engine)?;
        {
            let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
            if inputs.engine_on != engine_on {
                debug!("Engine {}", if engine_on { "on" } else { "off" });
            }
            inputs.engine_on = engine_on;
            inputs.engine_light_on = engine_on;
        }
        self.vehicle
            .actuators
            .write_digital(DigitalOutput::EngineLight, engine_on)?;
        Ok(())
    }
}

/// Moving average over the speed history (200 ms)
pub struct AverageFilter {
    vehicle: Vehicle,
    token: LockToken,
}

impl AverageFilter {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for AverageFilter {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let mut speed = self.vehicle.state.lock_speed(&mut self.token);
        let (current, mut average) = speed.lock_average();
        let average_speed = average.refresh(current.history());
        metrics::gauge!("vehicle_average_speed").set(average_speed);
        Ok(())
    }
}

/// Flashes the overspeed warning above the threshold (2000 ms)
pub struct OverspeedMonitor {
    vehicle: Vehicle,
    token: LockToken,
}

impl OverspeedMonitor {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for OverspeedMonitor {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let lit = self
            .vehicle
            .state
            .lock_average(&mut self.token)
            .overspeed_tick();
        self.vehicle
            .actuators
            .write_digital(DigitalOutput::OverspeedWarning, lit)?;
        Ok(())
    }
}

/// Snapshots average speed and pedals into the telemetry queue (5000 ms)
pub struct TelemetryProducer {
    vehicle: Vehicle,
    token: LockToken,
}

impl TelemetryProducer {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for TelemetryProducer {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let state = &self.vehicle.state;
        let speed = state.lock_average(&mut self.token).average_speed;
        let (acceleration, brake) = {
            let inputs = state.lock_inputs(&mut self.token);
            (inputs.acceleration, inputs.brake)
        };

        let sample = TelemetrySample::new(speed, acceleration, brake);
        state.lock_queue(&mut self.token).push(sample)?;
        debug!("Queued telemetry sample {:?}", sample);
        Ok(())
    }
}

/// Drains the telemetry queue into the sinks (20000 ms).
///
/// Sink writes are blocking file and stdout I/O done on the scheduler's
/// worker thread under the queue lock; one drain is at most
/// `queue_capacity` short appends.
pub struct TelemetryConsumer<S> {
    vehicle: Vehicle,
    token: LockToken,
    sink: S,
}

impl<S: TelemetrySink> TelemetryConsumer<S> {
    pub fn new(vehicle: Vehicle, sink: S) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: TelemetrySink + 'static> PeriodicTask for TelemetryConsumer<S> {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let mut queue = self.vehicle.state.lock_queue(&mut self.token);
        queue.drain_to(&mut self.sink)?;
        Ok(())
    }
}

/// Samples the left and right indicator switches (2000 ms)
pub struct IndicatorSampler {
    vehicle: Vehicle,
    token: LockToken,
}

impl IndicatorSampler {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }
}

impl PeriodicTask for IndicatorSampler {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let sensors = &self.vehicle.sensors;
        let left = sensors.read_digital(DigitalInput::LeftIndicator)?;
        let right = sensors.read_digital(DigitalInput::RightIndicator)?;

        let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
        inputs.left_switch = left;
        inputs.right_switch = right;
        Ok(())
    }
}

/// 1 Hz group: single-side indicator flash, side light, speed servo
pub struct OneHertz {
    vehicle: Vehicle,
    token: LockToken,
}

impl OneHertz {
    pub fn new(vehicle: Vehicle) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
        }
    }

    fn flash_indicator(&mut self) -> Result<(), VehicleError> {
        let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
        let mode = inputs.indicator_mode();
        let lamps = inputs.indicators.flash_tick(mode);
        write_lamps(self.vehicle.actuators.as_ref(), lamps)
    }

    fn side_light(&mut self) -> Result<(), VehicleError> {
        let on = self.vehicle.sensors.read_digital(DigitalInput::SideLight)?;
        {
            let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
            inputs.side_switch = on;
            inputs.side_light_on = on;
        }
        self.vehicle
            .actuators
            .write_digital(DigitalOutput::SideLight, on)?;
        Ok(())
    }

    fn speed_servo(&mut self) -> Result<(), VehicleError> {
        let average_speed = self
            .vehicle
            .state
            .lock_average(&mut self.token)
            .average_speed;
        // Full deflection at rest, zero at top speed
        let position = 1.0 - average_speed / MAX_SPEED;
        self.vehicle
            .actuators
            .write_analog(AnalogOutput::SpeedServo, position)?;
        Ok(())
    }
}

impl PeriodicTask for OneHertz {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let results = [self.flash_indicator(), self.side_light(), self.speed_servo()];
        first_error(results)
    }
}

/// 2 Hz group: hazard flash and odometer display
pub struct TwoHertz<D> {
    vehicle: Vehicle,
    token: LockToken,
    display: D,
    odometer_mode: OdometerMode,
}

impl<D: TextDisplay> TwoHertz<D> {
    pub fn new(vehicle: Vehicle, display: D, odometer_mode: OdometerMode) -> Self {
        Self {
            vehicle,
            token: LockToken::new(),
            display,
            odometer_mode,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    fn flash_hazard(&mut self) -> Result<(), VehicleError> {
        let mut inputs = self.vehicle.state.lock_inputs(&mut self.token);
        let mode = inputs.indicator_mode();
        let lamps = inputs.indicators.hazard_tick(mode);
        write_lamps(self.vehicle.actuators.as_ref(), lamps)
    }

    fn update_odometer(&mut self) -> Result<(), VehicleError> {
        let (odometer, average_speed) = {
            let mut average = self.vehicle.state.lock_average(&mut self.token);
            let odometer = average.advance_odometer(self.odometer_mode);
            (odometer, average.average_speed)
        };
        metrics::gauge!("vehicle_odometer").set(odometer);

        // Padded to the full width so shorter values erase longer ones
        self.display.locate(0, 0);
        self.display.print(&format!(
            "{:<width$}",
            format!("odo : {:.0}", odometer),
            width = DISPLAY_COLS
        ))?;
        self.display.locate(1, 0);
        self.display.print(&format!(
            "{:<width$}",
            format!("speed : {:.2}", average_speed),
            width = DISPLAY_COLS
        ))?;
        Ok(())
    }
}

impl<D: TextDisplay + 'static> PeriodicTask for TwoHertz<D> {
    type Error = VehicleError;

    fn tick(&mut self) -> Result<(), VehicleError> {
        let results = [self.flash_hazard(), self.update_odometer()];
        first_error(results)
    }
}
