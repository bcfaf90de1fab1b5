//! Line-oriented telemetry stream

use std::io::{self, Write};
use telemetry::{PersistenceError, TelemetrySample, TelemetrySink};

/// Emits one text line per sample on any writer (stdout in the simulator,
/// a serial port on hardware).
pub struct TelemetryStream<W> {
    writer: W,
}

impl<W: Write + Send> TelemetryStream<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Format one sample as a stream line
    pub fn format_line(sample: &TelemetrySample) -> String {
        format!(
            "average speed: {:.6} ,break value: {:.6} ,acceleration: {:.6} \r\n",
            sample.speed, sample.brake, sample.acceleration
        )
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl TelemetryStream<io::Stdout> {
    /// Stream to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TelemetrySink for TelemetryStream<W> {
    fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
        self.writer
            .write_all(Self::format_line(sample).as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| PersistenceError::write_failed("telemetry stream", e))
    }
}
