//! Lock domains and lock-ordering guards
//!
//! [`VehicleState`] owns one mutex per domain. Every acquisition goes
//! through a task's [`LockToken`], and each guard mutably borrows that token
//! for as long as it lives. A task body can therefore hold a single guard at a
//! time; the one permitted pair, speed then average, is reachable only
//! through [`SpeedGuard::lock_average`]. With one token, acquiring the locks
//! in the opposite order does not compile.
//!
//! A second token does not bypass the rule: each thread records the domains
//! it holds, and any nested acquisition other than average under speed
//! panics before it waits on the mutex.

use crate::average::AverageState;
use crate::indicator::{IndicatorLamps, IndicatorMode};
use crate::speed::{DriverInputs, SpeedState};
use std::cell::Cell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard};
use telemetry::TelemetryQueue;
use tracing::warn;

/// Sampled switches and pedals plus the lamp mirrors written under the
/// input lock
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    /// Accelerator position [0, 1]
    pub acceleration: f64,
    /// Brake position [0, 1]
    pub brake: f64,
    pub engine_on: bool,
    pub left_switch: bool,
    pub right_switch: bool,
    pub side_switch: bool,
    pub indicators: IndicatorLamps,
    pub side_light_on: bool,
    pub engine_light_on: bool,
}

impl InputState {
    /// Inputs consumed by the speed model
    pub fn driver_inputs(&self) -> DriverInputs {
        DriverInputs {
            acceleration: self.acceleration,
            brake: self.brake,
            engine_on: self.engine_on,
        }
    }

    pub fn indicator_mode(&self) -> IndicatorMode {
        IndicatorMode::from_switches(self.left_switch, self.right_switch)
    }
}

/// Per-task lock capability.
///
/// Not `Clone`: each periodic task creates exactly one and passes it to every
/// lock call it makes.
#[derive(Debug)]
pub struct LockToken {
    _private: (),
}

impl LockToken {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every domain, taken one lock at a time
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub inputs: InputState,
    pub speed: SpeedState,
    pub average: AverageState,
    pub pending: usize,
    pub write_count: u64,
    pub read_count: u64,
}

/// Shared state owned by the scheduler for the lifetime of the process
#[derive(Debug)]
pub struct VehicleState {
    inputs: Mutex<InputState>,
    speed: Mutex<SpeedState>,
    average: Mutex<AverageState>,
    queue: Mutex<TelemetryQueue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Input,
    Speed,
    Average,
    Queue,
}

impl Domain {
    fn bit(self) -> u8 {
        1 << self as u8
    }

    fn name(self) -> &'static str {
        match self {
            Domain::Input => "input",
            Domain::Speed => "speed",
            Domain::Average => "average",
            Domain::Queue => "queue",
        }
    }
}

thread_local! {
    static HELD: Cell<u8> = const { Cell::new(0) };
}

/// Marks a domain as held by the current thread until dropped
#[derive(Debug)]
struct Held(Domain);

impl Held {
    fn enter(domain: Domain) -> Self {
        HELD.with(|held| {
            let current = held.get();
            let permitted =
                current == 0 || (domain == Domain::Average && current == Domain::Speed.bit());
            assert!(
                permitted,
                "lock order violated: {} lock requested while holding {:#06b}",
                domain.name(),
                current
            );
            held.set(current | domain.bit());
        });
        Held(domain)
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        let bit = self.0.bit();
        HELD.with(|held| held.set(held.get() & !bit));
    }
}

fn acquire<T>(mutex: &Mutex<T>, domain: Domain) -> (MutexGuard<'_, T>, Held) {
    let held = Held::enter(domain);
    // Domains hold plain values, so the data is valid even after a panic
    let guard = mutex.lock().unwrap_or_else(|poisoned| {
        warn!("{} lock poisoned by a panicked task, recovering", domain.name());
        poisoned.into_inner()
    });
    (guard, held)
}

impl VehicleState {
    /// Create the state with everything at rest
    pub fn new(queue: TelemetryQueue) -> Self {
        Self {
            inputs: Mutex::new(InputState::default()),
            speed: Mutex::new(SpeedState::default()),
            average: Mutex::new(AverageState::default()),
            queue: Mutex::new(queue),
        }
    }

    /// Lock the input domain
    pub fn lock_inputs<'a>(&'a self, _token: &'a mut LockToken) -> InputGuard<'a> {
        let (guard, held) = acquire(&self.inputs, Domain::Input);
        InputGuard {
            guard,
            _held: held,
            _token: PhantomData,
        }
    }

    /// Lock the instantaneous-speed domain
    pub fn lock_speed<'a>(&'a self, _token: &'a mut LockToken) -> SpeedGuard<'a> {
        let (guard, held) = acquire(&self.speed, Domain::Speed);
        SpeedGuard {
            guard,
            _held: held,
            average: &self.average,
            _token: PhantomData,
        }
    }

    /// Lock the average-speed domain on its own
    pub fn lock_average<'a>(&'a self, _token: &'a mut LockToken) -> AverageGuard<'a> {
        let (guard, held) = acquire(&self.average, Domain::Average);
        AverageGuard {
            guard,
            _held: held,
            _token: PhantomData,
        }
    }

    /// Lock the telemetry queue domain
    pub fn lock_queue<'a>(&'a self, _token: &'a mut LockToken) -> QueueGuard<'a> {
        let (guard, held) = acquire(&self.queue, Domain::Queue);
        QueueGuard {
            guard,
            _held: held,
            _token: PhantomData,
        }
    }

    /// Copy every domain, releasing each lock before taking the next
    pub fn snapshot(&self, token: &mut LockToken) -> VehicleSnapshot {
        let inputs = *self.lock_inputs(token);
        let speed = *self.lock_speed(token);
        let average = *self.lock_average(token);
        let queue = self.lock_queue(token);
        VehicleSnapshot {
            inputs,
            speed,
            average,
            pending: queue.pending(),
            write_count: queue.write_count(),
            read_count: queue.read_count(),
        }
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new(TelemetryQueue::default())
    }
}

macro_rules! guard_deref {
    ($guard:ident, $target:ty) => {
        impl Deref for $guard<'_> {
            type Target = $target;

            fn deref(&self) -> &Self::Target {
                &self.guard
            }
        }

        impl DerefMut for $guard<'_> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.guard
            }
        }
    };
}

/// Held input lock
pub struct InputGuard<'a> {
    guard: MutexGuard<'a, InputState>,
    _held: Held,
    _token: PhantomData<&'a mut LockToken>,
}

/// Held instantaneous-speed lock
pub struct SpeedGuard<'a> {
    guard: MutexGuard<'a, SpeedState>,
    _held: Held,
    average: &'a Mutex<AverageState>,
    _token: PhantomData<&'a mut LockToken>,
}

/// Held average-speed lock
pub struct AverageGuard<'a> {
    guard: MutexGuard<'a, AverageState>,
    _held: Held,
    _token: PhantomData<&'a mut LockToken>,
}

/// Held telemetry queue lock
pub struct QueueGuard<'a> {
    guard: MutexGuard<'a, TelemetryQueue>,
    _held: Held,
    _token: PhantomData<&'a mut LockToken>,
}

impl<'a> SpeedGuard<'a> {
    /// Take the average lock while holding the speed lock.
    ///
    /// The speed domain stays readable but not writable until the returned
    /// average guard is dropped, and the average lock is always released
    /// first.
    pub fn lock_average(&mut self) -> (&SpeedState, AverageGuard<'_>) {
        let (guard, held) = acquire(self.average, Domain::Average);
        let average = AverageGuard {
            guard,
            _held: held,
            _token: PhantomData,
        };
        (&*self.guard, average)
    }
}

guard_deref!(InputGuard, InputState);
guard_deref!(SpeedGuard, SpeedState);
guard_deref!(AverageGuard, AverageState);
guard_deref!(QueueGuard, TelemetryQueue);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed::SpeedHistory;
    use std::sync::Arc;
    use std::thread;
    use telemetry::TelemetrySample;

    #[test]
    fn test_domains_start_at_rest() {
        let state = VehicleState::default();
        let mut token = LockToken::new();
        let snapshot = state.snapshot(&mut token);

        assert_eq!(snapshot.speed.current(), 0.0);
        assert_eq!(snapshot.average.odometer, 0.0);
        assert_eq!(snapshot.pending, 0);
    }

    #[test]
    fn test_speed_then_average() {
        let state = VehicleState::default();
        let mut token = LockToken::new();
        {
            let mut speed = state.lock_speed(&mut token);
            *speed = SpeedState::from_parts(30.0, SpeedHistory::from_samples([10.0, 20.0, 30.0]));
        }

        let mut speed = state.lock_speed(&mut token);
        let (current, mut average) = speed.lock_average();
        average.refresh(current.history());
        assert!((average.average_speed - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_guard_writes_are_visible() {
        let state = VehicleState::default();
        let mut token = LockToken::new();
        state.lock_inputs(&mut token).acceleration = 0.5;
        state
            .lock_queue(&mut token)
            .push(TelemetrySample::new(1.0, 0.5, 0.0))
            .unwrap();

        let snapshot = state.snapshot(&mut token);
        assert_eq!(snapshot.inputs.acceleration, 0.5);
        assert_eq!(snapshot.write_count, 1);
    }

    #[test]
    fn test_concurrent_pair_and_single_locks() {
        let state = Arc::new(VehicleState::default());
        let mut handles = Vec::new();

        // Filter-style tasks take speed then average
        for _ in 0..4 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || {
                let mut token = LockToken::new();
                for _ in 0..1000 {
                    let mut speed = state.lock_speed(&mut token);
                    let (current, mut average) = speed.lock_average();
                    average.refresh(current.history());
                }
            }));
        }

        // Dynamics-style and odometer-style tasks take one lock each
        for _ in 0..4 {
            let state = Arc::clone(&state);
            handles.push(thread::spawn(move || {
                let mut token = LockToken::new();
                for _ in 0..1000 {
                    state.lock_speed(&mut token).step(Default::default());
                    state.lock_average(&mut token).overspeed_tick();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    #[should_panic(expected = "lock order violated")]
    fn test_average_then_speed_rejected_across_tokens() {
        let state = VehicleState::default();
        let mut first = LockToken::new();
        let mut second = LockToken::new();
        let _average = state.lock_average(&mut first);
        let _speed = state.lock_speed(&mut second);
    }

    #[test]
    #[should_panic(expected = "lock order violated")]
    fn test_nested_single_domains_rejected() {
        let state = VehicleState::default();
        let mut first = LockToken::new();
        let mut second = LockToken::new();
        let _inputs = state.lock_inputs(&mut first);
        let _queue = state.lock_queue(&mut second);
    }

    #[test]
    fn test_released_domains_can_be_retaken() {
        let state = VehicleState::default();
        let mut first = LockToken::new();
        let mut second = LockToken::new();
        {
            let mut speed = state.lock_speed(&mut first);
            let (_, _average) = speed.lock_average();
        }
        let average = state.lock_average(&mut first);
        drop(average);
        let _speed = state.lock_speed(&mut second);
    }

    #[test]
    fn test_rejected_order_does_not_deadlock_other_threads() {
        let state = Arc::new(VehicleState::default());
        let violator = Arc::clone(&state);
        let result = thread::spawn(move || {
            let mut first = LockToken::new();
            let mut second = LockToken::new();
            let _average = violator.lock_average(&mut first);
            let _speed = violator.lock_speed(&mut second);
        })
        .join();
        assert!(result.is_err());

        // Both domains were released during unwinding
        let mut token = LockToken::new();
        let mut speed = state.lock_speed(&mut token);
        let (_, average) = speed.lock_average();
        assert_eq!(average.odometer, 0.0);
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let state = Arc::new(VehicleState::default());
        let poisoner = Arc::clone(&state);
        let _ = thread::spawn(move || {
            let mut token = LockToken::new();
            let mut inputs = poisoner.lock_inputs(&mut token);
            inputs.brake = 1.0;
            panic!("task body panicked");
        })
        .join();

        let mut token = LockToken::new();
        assert_eq!(state.lock_inputs(&mut token).brake, 1.0);
    }
}
