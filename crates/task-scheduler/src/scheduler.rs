//! Task Scheduler Implementation

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Body of a periodic task, run once per period
pub trait PeriodicTask: Send + 'static {
    /// Error returned by a failed cycle
    type Error: fmt::Display;

    /// Run one cycle. Must finish well within the task's period.
    fn tick(&mut self) -> Result<(), Self::Error>;
}

impl<F, E> PeriodicTask for F
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: fmt::Display,
{
    type Error = E;

    fn tick(&mut self) -> Result<(), E> {
        (self)()
    }
}

/// Errors raised while registering tasks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Task {0} has a zero period")]
    ZeroPeriod(String),
    #[error("Task {0} is already registered")]
    DuplicateTask(String),
}

/// Configuration for the task scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Contain panics to the failing cycle instead of ending the task
    pub catch_panics: bool,
    /// Log a warning when a cycle runs longer than its period
    pub warn_on_overrun: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            warn_on_overrun: true,
        }
    }
}

/// Per-task statistics at the time of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    pub period: Duration,
    /// Cycles executed, including failed ones
    pub ticks: u64,
    /// Cycles that returned an error
    pub failures: u64,
    /// Cycles that panicked
    pub panics: u64,
    /// Cycles that took longer than the period
    pub overruns: u64,
}

#[derive(Debug, Default)]
struct TaskCounters {
    ticks: AtomicU64,
    failures: AtomicU64,
    panics: AtomicU64,
    overruns: AtomicU64,
}

type TaskBody = Box<dyn FnMut() -> Result<(), String> + Send>;

struct Registration {
    name: String,
    period: Duration,
    body: TaskBody,
    counters: Arc<TaskCounters>,
}

impl Registration {
    fn report(&self) -> TaskReport {
        report(&self.name, self.period, &self.counters)
    }
}

fn report(name: &str, period: Duration, counters: &TaskCounters) -> TaskReport {
    TaskReport {
        name: name.to_string(),
        period,
        ticks: counters.ticks.load(Ordering::Relaxed),
        failures: counters.failures.load(Ordering::Relaxed),
        panics: counters.panics.load(Ordering::Relaxed),
        overruns: counters.overruns.load(Ordering::Relaxed),
    }
}

/// Collects task registrations and starts them together
pub struct TaskScheduler {
    config: SchedulerConfig,
    tasks: Vec<Registration>,
}

impl TaskScheduler {
    /// Create an empty scheduler
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
        }
    }

    /// Register a named task running every `period`
    pub fn register<T: PeriodicTask>(
        &mut self,
        name: impl Into<String>,
        period: Duration,
        mut task: T,
    ) -> Result<&mut Self, SchedulerError> {
        let name = name.into();
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod(name));
        }
        if self.tasks.iter().any(|t| t.name == name) {
            return Err(SchedulerError::DuplicateTask(name));
        }

        debug!("Registered task {} every {:?}", name, period);
        self.tasks.push(Registration {
            name,
            period,
            body: Box::new(move || task.tick().map_err(|e| e.to_string())),
            counters: Arc::default(),
        });
        Ok(self)
    }

    /// Get the number of registered tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Spawn every registered task on the current tokio runtime
    pub fn start(self) -> SchedulerHandle {
        info!("Starting scheduler with {} tasks", self.tasks.len());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = self
            .tasks
            .into_iter()
            .map(|registration| {
                let name = registration.name.clone();
                let period = registration.period;
                let counters = Arc::clone(&registration.counters);
                let handle = tokio::spawn(run_task(
                    registration,
                    shutdown_rx.clone(),
                    self.config.clone(),
                ));
                RunningTask {
                    name,
                    period,
                    counters,
                    handle,
                }
            })
            .collect();

        SchedulerHandle { shutdown_tx, tasks }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

async fn run_task(
    mut registration: Registration,
    mut shutdown: watch::Receiver<bool>,
    config: SchedulerConfig,
) -> TaskReport {
    let mut interval = tokio::time::interval(registration.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!("Task {} running every {:?}", registration.name, registration.period);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // A dropped handle counts as cancellation
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = interval.tick() => {}
        }

        if *shutdown.borrow() {
            break;
        }

        let counters = &registration.counters;
        let started = Instant::now();
        let outcome = if config.catch_panics {
            catch_unwind(AssertUnwindSafe(|| (registration.body)()))
        } else {
            Ok((registration.body)())
        };
        let elapsed = started.elapsed();
        counters.ticks.fetch_add(1, Ordering::Relaxed);

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!("Task {} cycle skipped: {}", registration.name, e);
            }
            Err(_) => {
                counters.panics.fetch_add(1, Ordering::Relaxed);
                error!("Task {} panicked, continuing next period", registration.name);
            }
        }

        if elapsed > registration.period {
            counters.overruns.fetch_add(1, Ordering::Relaxed);
            if config.warn_on_overrun {
                warn!(
                    "Task {} overran its period: {:?} > {:?}",
                    registration.name, elapsed, registration.period
                );
            }
        }
    }

    debug!("Task {} stopped", registration.name);
    registration.report()
}

struct RunningTask {
    name: String,
    period: Duration,
    counters: Arc<TaskCounters>,
    handle: JoinHandle<TaskReport>,
}

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<RunningTask>,
}

impl SchedulerHandle {
    /// Signal every task to stop at the top of its next cycle
    pub fn shutdown(&self) {
        info!("Stopping scheduler");
        self.shutdown_tx.send_replace(true);
    }

    /// Check if shutdown was requested
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Live statistics of every task
    pub fn reports(&self) -> Vec<TaskReport> {
        self.tasks
            .iter()
            .map(|t| report(&t.name, t.period, &t.counters))
            .collect()
    }

    /// Wait for every task to stop and return their final statistics
    pub async fn join(self) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!("Task {} ended abnormally: {}", task.name, e);
                    reports.push(report(&task.name, task.period, &task.counters));
                }
            }
        }
        info!("Scheduler stopped");
        reports
    }

    /// Run until `signal` completes, then shut down and join
    pub async fn run_until(self, signal: impl Future<Output = ()>) -> Vec<TaskReport> {
        signal.await;
        self.shutdown();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::AtomicU32;

    fn counting(counter: &Arc<AtomicU32>) -> impl FnMut() -> Result<(), Infallible> + Send {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut scheduler = TaskScheduler::default();
        let err = scheduler
            .register("bad", Duration::ZERO, || Ok::<(), Infallible>(()))
            .err();
        assert_eq!(err, Some(SchedulerError::ZeroPeriod("bad".to_string())));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut scheduler = TaskScheduler::default();
        let period = Duration::from_millis(10);
        scheduler
            .register("dup", period, || Ok::<(), Infallible>(()))
            .unwrap();
        assert!(scheduler
            .register("dup", period, || Ok::<(), Infallible>(()))
            .is_err());
        assert_eq!(scheduler.task_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_at_their_period() {
        let fast = Arc::new(AtomicU32::new(0));
        let slow = Arc::new(AtomicU32::new(0));

        let mut scheduler = TaskScheduler::default();
        scheduler
            .register("fast", Duration::from_millis(50), counting(&fast))
            .unwrap()
            .register("slow", Duration::from_millis(500), counting(&slow))
            .unwrap();
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(990)).await;
        handle.shutdown();
        let reports = handle.join().await;

        // First tick fires immediately
        assert_eq!(fast.load(Ordering::Relaxed), 20);
        assert_eq!(slow.load(Ordering::Relaxed), 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "fast");
        assert_eq!(reports[0].ticks, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycles_retry_next_period() {
        let mut scheduler = TaskScheduler::default();
        scheduler
            .register("failing", Duration::from_millis(100), || {
                Err::<(), _>("sensor unavailable")
            })
            .unwrap();
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(450)).await;
        let reports = handle.run_until(async {}).await;

        assert_eq!(reports[0].ticks, 5);
        assert_eq!(reports[0].failures, 5);
        assert_eq!(reports[0].panics, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_contained() {
        let mut calls = 0;
        let mut scheduler = TaskScheduler::default();
        scheduler
            .register("flaky", Duration::from_millis(100), move || {
                calls += 1;
                if calls == 1 {
                    panic!("first cycle fails");
                }
                Ok::<(), Infallible>(())
            })
            .unwrap();
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(350)).await;
        handle.shutdown();
        let reports = handle.join().await;

        assert_eq!(reports[0].panics, 1);
        assert_eq!(reports[0].ticks, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut scheduler = TaskScheduler::default();
        scheduler
            .register("counter", Duration::from_millis(50), counting(&counter))
            .unwrap();
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.shutdown();
        assert!(handle.is_shutting_down());
        handle.join().await;

        let stopped_at = counter.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::Relaxed), stopped_at);
    }
}
