//! Indicator and hazard automaton
//!
//! The switch pair selects one of four modes. Two tick sources drive the
//! lamps: the 1 Hz flash tick handles single-side indication and the 2 Hz
//! hazard tick handles hazard mode. Both are level-triggered, re-evaluated
//! from the current mode on every tick.

/// Mode selected by the left/right indicator switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndicatorMode {
    #[default]
    Off,
    LeftOnly,
    RightOnly,
    /// Both switches on, both lamps flash in phase
    Hazard,
}

impl IndicatorMode {
    pub fn from_switches(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => IndicatorMode::Off,
            (true, false) => IndicatorMode::LeftOnly,
            (false, true) => IndicatorMode::RightOnly,
            (true, true) => IndicatorMode::Hazard,
        }
    }
}

/// Indicator lamp outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorLamps {
    pub left: bool,
    pub right: bool,
}

impl IndicatorLamps {
    /// Single-side flash tick (1 Hz).
    ///
    /// In hazard mode the lamps are owned by [`IndicatorLamps::hazard_tick`];
    /// this tick only pulls the right lamp into phase with the left one.
    pub fn flash_tick(&mut self, mode: IndicatorMode) -> Self {
        match mode {
            IndicatorMode::Off => {
                self.left = false;
                self.right = false;
            }
            IndicatorMode::LeftOnly => {
                self.left = !self.left;
                self.right = false;
            }
            IndicatorMode::RightOnly => {
                self.left = false;
                self.right = !self.right;
            }
            IndicatorMode::Hazard => self.right = self.left,
        }
        *self
    }

    /// Hazard flash tick (2 Hz). No effect outside hazard mode.
    pub fn hazard_tick(&mut self, mode: IndicatorMode) -> Self {
        if mode == IndicatorMode::Hazard {
            self.left = !self.left;
            self.right = self.left;
        }
        *self
    }
}
