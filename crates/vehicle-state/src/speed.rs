//! Speed model and sample history

/// Top speed of the simulated car
pub const MAX_SPEED: f64 = 140.0;
/// Integration step of the dynamics task (50 ms)
pub const DYNAMICS_STEP_S: f64 = 0.05;
/// Number of samples averaged by the moving-average filter
pub const HISTORY_LEN: usize = 3;

/// Pedal and engine inputs consumed by one dynamics step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverInputs {
    /// Accelerator position [0, 1]
    pub acceleration: f64,
    /// Brake position [0, 1]
    pub brake: f64,
    pub engine_on: bool,
}

/// Advance `current` by one dynamics step.
///
/// The pedal difference is scaled to ±100 units/s², integrated over
/// [`DYNAMICS_STEP_S`] and zeroed when the engine is off. The result is
/// clamped to `[0, MAX_SPEED]`.
pub fn integrate(current: f64, inputs: DriverInputs) -> f64 {
    let total_acc = (inputs.acceleration - inputs.brake) * 100.0;
    let engine = if inputs.engine_on { 1.0 } else { 0.0 };
    let speed = (current + total_acc * DYNAMICS_STEP_S) * engine;
    speed.clamp(0.0, MAX_SPEED)
}

/// Fixed ring of the last [`HISTORY_LEN`] speed samples
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedHistory {
    samples: [f64; HISTORY_LEN],
    /// Slot overwritten by the next push
    next: usize,
}

impl SpeedHistory {
    /// Create a history filled with zeros
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history holding the given samples, next write at slot 0
    pub fn from_samples(samples: [f64; HISTORY_LEN]) -> Self {
        Self { samples, next: 0 }
    }

    /// Overwrite the oldest slot
    pub fn push(&mut self, speed: f64) {
        self.samples[self.next] = speed;
        self.next = (self.next + 1) % HISTORY_LEN;
    }

    /// Raw slots in storage order
    pub fn samples(&self) -> &[f64; HISTORY_LEN] {
        &self.samples
    }

    /// Slot the next push writes to
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Mean over all slots, including zeros not yet overwritten
    pub fn mean(&self) -> f64 {
        self.samples.iter().sum::<f64>() / HISTORY_LEN as f64
    }
}

/// Instantaneous-speed lock domain
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedState {
    current: f64,
    history: SpeedHistory,
}

impl SpeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from explicit parts, clamping the speed
    pub fn from_parts(current: f64, history: SpeedHistory) -> Self {
        Self {
            current: current.clamp(0.0, MAX_SPEED),
            history,
        }
    }

    /// Run one dynamics tick and record the result in the history
    pub fn step(&mut self, inputs: DriverInputs) -> f64 {
        self.current = integrate(self.current, inputs);
        self.history.push(self.current);
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn history(&self) -> &SpeedHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(acceleration: f64, brake: f64, engine_on: bool) -> DriverInputs {
        DriverInputs {
            acceleration,
            brake,
            engine_on,
        }
    }

    #[test]
    fn test_half_throttle_from_rest() {
        let speed = integrate(0.0, inputs(0.5, 0.0, true));
        assert!((speed - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_engine_off_zeroes_speed() {
        assert_eq!(integrate(80.0, inputs(1.0, 0.0, false)), 0.0);
    }

    #[test]
    fn test_clamped_to_max_speed() {
        assert_eq!(integrate(139.0, inputs(1.0, 0.0, true)), MAX_SPEED);
    }

    #[test]
    fn test_braking_never_negative() {
        assert_eq!(integrate(1.0, inputs(0.0, 1.0, true)), 0.0);
    }

    #[test]
    fn test_history_wraps() {
        let mut history = SpeedHistory::new();
        for speed in [1.0, 2.0, 3.0, 4.0] {
            history.push(speed);
        }

        assert_eq!(history.samples(), &[4.0, 2.0, 3.0]);
        assert_eq!(history.next_index(), 1);
    }

    #[test]
    fn test_step_records_history() {
        let mut state = SpeedState::new();
        state.step(inputs(1.0, 0.0, true));
        state.step(inputs(1.0, 0.0, true));

        assert!((state.current() - 10.0).abs() < 1e-9);
        assert_eq!(state.history().samples(), &[5.0, 10.0, 0.0]);
    }

    #[test]
    fn test_mean_of_history() {
        let history = SpeedHistory::from_samples([10.0, 20.0, 30.0]);
        assert!((history.mean() - 20.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_one_tick_from_rest(
            acceleration in 0.0f64..=1.0,
            brake in 0.0f64..=1.0,
            engine_on in any::<bool>(),
        ) {
            let engine = if engine_on { 1.0 } else { 0.0 };
            let expected = ((acceleration - brake) * 100.0 * 0.05 * engine).clamp(0.0, MAX_SPEED);
            let speed = integrate(0.0, inputs(acceleration, brake, engine_on));
            prop_assert!((speed - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_speed_stays_in_range(
            start in 0.0f64..=MAX_SPEED,
            acceleration in 0.0f64..=1.0,
            brake in 0.0f64..=1.0,
            engine_on in any::<bool>(),
        ) {
            let speed = integrate(start, inputs(acceleration, brake, engine_on));
            prop_assert!((0.0..=MAX_SPEED).contains(&speed));
        }
    }
}
