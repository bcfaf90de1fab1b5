//! Telemetry sinks

use crate::error::PersistenceError;
use crate::TelemetrySample;

/// Destination for drained telemetry samples
pub trait TelemetrySink: Send {
    /// Persist or emit a single sample
    fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError>;
}

/// Sink collecting samples in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub samples: Vec<TelemetrySample>,
    /// Fail the next `n` writes
    pub fail_next: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetrySink for MemorySink {
    fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(PersistenceError::write_failed("memory", "injected failure"));
        }
        self.samples.push(*sample);
        Ok(())
    }
}
