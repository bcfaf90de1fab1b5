//! Telemetry Queue
//!
//! A producer snapshots speed and pedal values into [`TelemetrySample`]s and
//! pushes them onto a bounded [`TelemetryQueue`]. A consumer periodically
//! drains the queue into one or more [`TelemetrySink`]s.

mod error;
mod queue;
mod sink;

pub use error::{PersistenceError, QueueError};
pub use queue::{OverflowPolicy, PushOutcome, TelemetryQueue, DEFAULT_CAPACITY};
pub use sink::{MemorySink, TelemetrySink};

use serde::{Deserialize, Serialize};

/// Immutable snapshot queued for persistence
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Average speed at the time of sampling
    pub speed: f64,
    /// Accelerator pedal position [0, 1]
    pub acceleration: f64,
    /// Brake pedal position [0, 1]
    pub brake: f64,
}

impl TelemetrySample {
    /// Create a new sample
    pub fn new(speed: f64, acceleration: f64, brake: f64) -> Self {
        Self {
            speed,
            acceleration,
            brake,
        }
    }
}
