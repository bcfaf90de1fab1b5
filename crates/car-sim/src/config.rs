//! Simulator configuration

use crate::error::ConfigError;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use telemetry::OverflowPolicy;
use tracing::Level;
use vehicle_io::PanelInputs;
use vehicle_state::OdometerMode;

/// Default configuration file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "car-sim.toml";
/// Prefix of environment variable overrides, e.g. `CAR_SIM__QUEUE_CAPACITY`
pub const ENV_PREFIX: &str = "CAR_SIM";

/// Task periods in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPeriods {
    /// Speed integration
    pub dynamics_ms: u64,
    /// Accelerator and brake sampling
    pub pedal_sampler_ms: u64,
    pub engine_monitor_ms: u64,
    pub average_filter_ms: u64,
    pub overspeed_monitor_ms: u64,
    pub telemetry_producer_ms: u64,
    pub telemetry_consumer_ms: u64,
    pub indicator_sampler_ms: u64,
    /// Indicator flash, side light and speed servo
    pub one_hertz_ms: u64,
    /// Hazard flash and odometer display
    pub two_hertz_ms: u64,
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            dynamics_ms: 50,
            pedal_sampler_ms: 100,
            engine_monitor_ms: 500,
            average_filter_ms: 200,
            overspeed_monitor_ms: 2000,
            telemetry_producer_ms: 5000,
            telemetry_consumer_ms: 20000,
            indicator_sampler_ms: 2000,
            one_hertz_ms: 1000,
            two_hertz_ms: 500,
        }
    }
}

impl TaskPeriods {
    /// All periods with their task names
    pub fn entries(&self) -> [(&'static str, u64); 10] {
        [
            ("dynamics", self.dynamics_ms),
            ("pedal_sampler", self.pedal_sampler_ms),
            ("engine_monitor", self.engine_monitor_ms),
            ("average_filter", self.average_filter_ms),
            ("overspeed_monitor", self.overspeed_monitor_ms),
            ("telemetry_producer", self.telemetry_producer_ms),
            ("telemetry_consumer", self.telemetry_consumer_ms),
            ("indicator_sampler", self.indicator_sampler_ms),
            ("one_hertz", self.one_hertz_ms),
            ("two_hertz", self.two_hertz_ms),
        ]
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub periods: TaskPeriods,
    /// Telemetry queue capacity (default: 100)
    pub queue_capacity: usize,
    /// Behaviour when the telemetry queue is full
    pub overflow_policy: OverflowPolicy,
    /// Odometer accumulation formula
    pub odometer_mode: OdometerMode,
    /// CSV telemetry log path
    pub log_path: PathBuf,
    /// Maximum tracing level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Prometheus exporter listen address, disabled when unset
    pub metrics_listen: Option<SocketAddr>,
    /// Initial pedal and switch positions of the simulated panel
    pub inputs: PanelInputs,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            periods: TaskPeriods::default(),
            queue_capacity: telemetry::DEFAULT_CAPACITY,
            overflow_policy: OverflowPolicy::Reject,
            odometer_mode: OdometerMode::Legacy,
            log_path: PathBuf::from("Car_Values.csv"),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_listen: None,
            inputs: PanelInputs::default(),
        }
    }
}

impl SimConfig {
    /// Load from an optional file layered under `CAR_SIM__*` environment
    /// variables. Without a path, `car-sim.toml` is used if it exists.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: SimConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulator cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, ms) in self.periods.entries() {
            if ms == 0 {
                return Err(ConfigError::Invalid(format!("{} period must be > 0", name)));
            }
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".to_string()));
        }
        self.level()?;
        Ok(())
    }

    /// Parsed tracing level
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {}", self.log_level)))
    }
}

/// Convert a millisecond period to a [`Duration`]
pub fn period(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
