//! Two-state blinking lamp

/// A lamp that flashes while active and is forced dark otherwise.
///
/// Each call to [`Blinker::tick`] is one period of the driving task, so the
/// blink rate equals the task rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blinker {
    lit: bool,
}

impl Blinker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one period. Toggles when `active`, otherwise goes dark.
    pub fn tick(&mut self, active: bool) -> bool {
        self.lit = active && !self.lit;
        self.lit
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
