//! Storage Layer
//!
//! Telemetry sinks used by the consumer task: an append-only CSV log file
//! and a line-oriented stream standing in for the serial link.

mod csv_log;
mod stream;

pub use csv_log::{CsvLog, CSV_HEADER};
pub use stream::TelemetryStream;

use telemetry::{PersistenceError, TelemetrySample, TelemetrySink};

/// Fans each sample out to several sinks in order.
///
/// Stops at the first failing sink. Sinks before it have already accepted the
/// sample, so a retried sample may be written to them twice.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to the end of the fan-out
    pub fn with(mut self, sink: impl TelemetrySink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for SinkSet {
    fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
        for sink in &mut self.sinks {
            sink.persist(sample)?;
        }
        Ok(())
    }
}
