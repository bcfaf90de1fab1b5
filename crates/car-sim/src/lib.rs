//! Car Control Loop Simulator
//!
//! Wires the simulated panel, shared vehicle state, telemetry sinks and the
//! ten periodic tasks of the control loop into a [`TaskScheduler`].
//!
//! | Task | Period |
//! |---|---|
//! | dynamics | 50 ms |
//! | pedal_sampler | 100 ms |
//! | engine_monitor | 500 ms |
//! | average_filter | 200 ms |
//! | overspeed_monitor | 2000 ms |
//! | telemetry_producer | 5000 ms |
//! | telemetry_consumer | 20000 ms |
//! | indicator_sampler | 2000 ms |
//! | one_hertz | 1000 ms |
//! | two_hertz | 500 ms |

mod config;
mod error;
mod tasks;

pub use self::config::{
    period, LogFormat, SimConfig, TaskPeriods, DEFAULT_CONFIG_FILE, ENV_PREFIX,
};
pub use error::{ConfigError, VehicleError};
pub use tasks::{
    AverageFilter, Dynamics, EngineMonitor, IndicatorSampler, OneHertz, OverspeedMonitor,
    PedalSampler, TelemetryConsumer, TelemetryProducer, TwoHertz, Vehicle,
};

use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{CsvLog, SinkSet, TelemetryStream};
use task_scheduler::{SchedulerConfig, TaskReport, TaskScheduler};
use telemetry::{TelemetryQueue, TelemetrySink};
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use vehicle_io::{LineDisplay, SimulatedPanel, TextDisplay};
use vehicle_state::{LockToken, VehicleSnapshot, VehicleState};

/// Initialize logging on stderr; stdout carries the telemetry stream
pub fn init_logging(config: &SimConfig) -> Result<(), VehicleError> {
    let level = config.level()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match config.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.map_err(|e| VehicleError::Logging(e.to_string()))
}

/// Serve Prometheus metrics on `addr`
pub fn install_metrics(addr: SocketAddr) -> Result<(), VehicleError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| VehicleError::Metrics(e.to_string()))?;
    info!("Serving metrics on {}", addr);
    Ok(())
}

/// Create the shared state with a queue sized from `config`
pub fn build_state(config: &SimConfig) -> Arc<VehicleState> {
    Arc::new(VehicleState::new(TelemetryQueue::new(
        config.queue_capacity,
        config.overflow_policy,
    )))
}

/// Register the ten control-loop tasks
pub fn build_scheduler(
    config: &SimConfig,
    vehicle: &Vehicle,
    sink: impl TelemetrySink + 'static,
    display: impl TextDisplay + 'static,
) -> Result<TaskScheduler, VehicleError> {
    let periods = &config.periods;
    let mut scheduler = TaskScheduler::new(SchedulerConfig::default());

    scheduler
        .register("dynamics", period(periods.dynamics_ms), Dynamics::new(vehicle.clone()))?
        .register(
            "pedal_sampler",
            period(periods.pedal_sampler_ms),
            PedalSampler::new(vehicle.clone()),
        )?
        .register(
            "engine_monitor",
            period(periods.engine_monitor_ms),
            EngineMonitor::new(vehicle.clone()),
        )?
        .register(
            "average_filter",
            period(periods.average_filter_ms),
            AverageFilter::new(vehicle.clone()),
        )?
        .register(
            "overspeed_monitor",
            period(periods.overspeed_monitor_ms),
            OverspeedMonitor::new(vehicle.clone()),
        )?
        .register(
            "telemetry_producer",
            period(periods.telemetry_producer_ms),
            TelemetryProducer::new(vehicle.clone()),
        )?
        .register(
            "telemetry_consumer",
            period(periods.telemetry_consumer_ms),
            TelemetryConsumer::new(vehicle.clone(), sink),
        )?
        .register(
            "indicator_sampler",
            period(periods.indicator_sampler_ms),
            IndicatorSampler::new(vehicle.clone()),
        )?
        .register("one_hertz", period(periods.one_hertz_ms), OneHertz::new(vehicle.clone()))?
        .register(
            "two_hertz",
            period(periods.two_hertz_ms),
            TwoHertz::new(vehicle.clone(), display, config.odometer_mode),
        )?;

    Ok(scheduler)
}

/// Final state of a simulation run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub tasks: Vec<TaskReport>,
    pub snapshot: VehicleSnapshot,
}

/// Run the simulator against a [`SimulatedPanel`] until `shutdown` completes.
///
/// Creates the CSV log, streams samples to stdout and shows the odometer on
/// an in-memory display.
pub async fn run(
    config: SimConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<RunSummary, VehicleError> {
    let panel = Arc::new(SimulatedPanel::with_inputs(config.inputs));
    let vehicle = Vehicle::new(build_state(&config), panel.clone(), panel);

    let sinks = SinkSet::new()
        .with(CsvLog::create(&config.log_path)?)
        .with(TelemetryStream::stdout());
    let mut display = LineDisplay::new();
    display.clear();

    let scheduler = build_scheduler(&config, &vehicle, sinks, display)?;
    let tasks = scheduler.start().run_until(shutdown).await;

    let snapshot = vehicle.state.snapshot(&mut LockToken::new());
    for task in &tasks {
        info!(
            "{}: {} ticks, {} failures, {} panics, {} overruns",
            task.name, task.ticks, task.failures, task.panics, task.overruns
        );
    }
    info!(
        "Stopped at {:.2} average speed, odometer {:.0}, {} samples pending",
        snapshot.average.average_speed, snapshot.average.odometer, snapshot.pending
    );

    Ok(RunSummary { tasks, snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use telemetry::{PersistenceError, TelemetrySample};
    use vehicle_io::PanelInputs;

    /// Sink whose samples stay visible to the test after the task owns it
    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<TelemetrySample>>>);

    impl TelemetrySink for SharedSink {
        fn persist(&mut self, sample: &TelemetrySample) -> Result<(), PersistenceError> {
            self.0.lock().unwrap().push(*sample);
            Ok(())
        }
    }

    #[test]
    fn test_registers_ten_tasks() {
        let config = SimConfig::default();
        let panel = Arc::new(SimulatedPanel::new());
        let vehicle = Vehicle::new(build_state(&config), panel.clone(), panel);

        let scheduler =
            build_scheduler(&config, &vehicle, SharedSink::default(), LineDisplay::new()).unwrap();
        assert_eq!(scheduler.task_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_loop_with_paused_clock() {
        let config = SimConfig::default();
        let panel = Arc::new(SimulatedPanel::with_inputs(PanelInputs {
            accelerator: 1.0,
            engine: true,
            left_indicator: true,
            ..Default::default()
        }));
        let vehicle = Vehicle::new(build_state(&config), panel.clone(), panel.clone());
        let sink = SharedSink::default();

        let handle = build_scheduler(&config, &vehicle, sink.clone(), LineDisplay::new())
            .unwrap()
            .start();
        // Producer fires at 0, 5, 10, 15 s; consumer at 0 and 20 s
        tokio::time::sleep(Duration::from_millis(20_100)).await;
        handle.shutdown();
        let reports = handle.join().await;

        assert_eq!(reports.len(), 10);
        assert!(reports.iter().all(|r| r.failures == 0 && r.panics == 0));

        let snapshot = vehicle.state.snapshot(&mut LockToken::new());
        let persisted = sink.0.lock().unwrap().len() as u64;
        assert_eq!(snapshot.write_count, 5);
        assert_eq!(snapshot.read_count, persisted);
        assert_eq!(snapshot.pending as u64, snapshot.write_count - snapshot.read_count);
        assert!(persisted >= 4);

        // Full throttle for 20 s pins the car at top speed
        assert_eq!(snapshot.speed.current(), vehicle_state::MAX_SPEED);
        assert!(snapshot.average.odometer > 0.0);
        assert!(panel.outputs().engine_light);
        assert!(!panel.outputs().right_indicator);
    }
}
