//! Average-speed lock domain

use crate::blink::Blinker;
use crate::speed::SpeedHistory;
use serde::{Deserialize, Serialize};

/// Average speed above which the overspeed warning flashes
pub const OVERSPEED_THRESHOLD: f64 = 70.0;
/// Period of the odometer update (2 Hz)
pub const ODOMETER_TICK_S: f64 = 0.5;

/// How the odometer accumulates the average speed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OdometerMode {
    /// `average / tick`, matching existing Car_Values logs
    #[default]
    Legacy,
    /// `average × tick`, distance travelled during the tick
    Distance,
}

/// State guarded by the average-speed lock
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AverageState {
    /// Mean of the speed history at the last filter tick
    pub average_speed: f64,
    /// Accumulated odometer, never decreasing
    pub odometer: f64,
    pub overspeed: Blinker,
}

impl AverageState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moving-average filter tick
    pub fn refresh(&mut self, history: &SpeedHistory) -> f64 {
        self.average_speed = history.mean();
        self.average_speed
    }

    /// Overspeed monitor tick, returns the new warning lamp state
    pub fn overspeed_tick(&mut self) -> bool {
        self.overspeed.tick(self.average_speed > OVERSPEED_THRESHOLD)
    }

    /// Odometer tick, returns the new odometer value
    pub fn advance_odometer(&mut self, mode: OdometerMode) -> f64 {
        let increment = match mode {
            OdometerMode::Legacy => self.average_speed / ODOMETER_TICK_S,
            OdometerMode::Distance => self.average_speed * ODOMETER_TICK_S,
        };
        self.odometer += increment.max(0.0);
        self.odometer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_average(average_speed: f64) -> AverageState {
        AverageState {
            average_speed,
            ..Default::default()
        }
    }

    #[test]
    fn test_refresh_from_history() {
        let mut state = AverageState::new();
        let average = state.refresh(&SpeedHistory::from_samples([10.0, 20.0, 30.0]));
        assert!((average - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_overspeed_toggles_above_threshold() {
        let mut state = with_average(75.0);
        let seq: Vec<bool> = (0..4).map(|_| state.overspeed_tick()).collect();
        assert_eq!(seq, vec![true, false, true, false]);
    }

    #[test]
    fn test_overspeed_forced_off_below_threshold() {
        let mut state = with_average(75.0);
        state.overspeed_tick();
        state.average_speed = 60.0;
        for _ in 0..3 {
            assert!(!state.overspeed_tick());
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut state = with_average(OVERSPEED_THRESHOLD);
        assert!(!state.overspeed_tick());
    }

    #[test]
    fn test_legacy_odometer() {
        let mut state = with_average(36.0);
        assert!((state.advance_odometer(OdometerMode::Legacy) - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_odometer() {
        let mut state = with_average(36.0);
        assert!((state.advance_odometer(OdometerMode::Distance) - 18.0).abs() < 1e-9);
    }
}
