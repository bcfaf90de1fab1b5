//! Append-only CSV telemetry log

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use telemetry::{PersistenceError, TelemetrySample, TelemetrySink};
use tracing::{debug, info};

/// Header row written when the log is created
pub const CSV_HEADER: &str = "Average_Speed,Accelerometer_Value,Brake_Value\r\n";

/// CSV log of telemetry samples.
///
/// Rows keep the legacy layout `"<speed> ,<accel> ,<brake> \r\n"`, six
/// decimals each, with the space before every comma, so existing log readers
/// keep working.
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
    rows: u64,
}

impl CsvLog {
    /// Create or truncate the log and write the header row
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let target = path.display().to_string();

        let mut file =
            File::create(&path).map_err(|e| PersistenceError::write_failed(&target, e))?;
        file.write_all(CSV_HEADER.as_bytes())
            .map_err(|e| PersistenceError::write_failed(&target, e))?;

        info!("Created telemetry log at {}", target);
        Ok(Self { path, rows: 0 })
    }

    /// Format one sample as a log row
    pub fn format_row(sample: &TelemetrySample) -> String {
        format!(
            "{:.6} ,{:.6} ,{:.6} \r\n",
            sample.speed, sample.acceleration, sample.brake
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended since creation
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl TelemetrySink for CsvLog {
    fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
        let target = self.path.display().to_string();
        // Reopened per row so the file is complete whenever power is cut
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::write_failed(&target, e))?;
        file.write_all(Self::format_row(sample).as_bytes())
            .map_err(|e| PersistenceError::write_failed(&target, e))?;

        self.rows += 1;
        debug!("Appended row {} to {}", self.rows, target);
        Ok(())
    }
}
