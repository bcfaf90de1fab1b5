//! Periodic Task Scheduler
//!
//! Runs a fixed set of named tasks, each on its own period, as independent
//! tokio tasks. Periods are soft targets: a slow cycle is counted as an
//! overrun and the task simply continues on its next tick.

mod scheduler;

pub use scheduler::{
    PeriodicTask, SchedulerConfig, SchedulerError, SchedulerHandle, TaskReport, TaskScheduler,
};
