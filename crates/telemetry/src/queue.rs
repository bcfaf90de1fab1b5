//! Bounded Telemetry Queue Implementation

use crate::error::{PersistenceError, QueueError};
use crate::sink::TelemetrySink;
use crate::TelemetrySample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Default queue capacity (100 samples = ~8 min at one sample per 5 s)
pub const DEFAULT_CAPACITY: usize = 100;

/// What a push does when the queue is already at capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new sample with [`QueueError::QueueFull`]
    #[default]
    Reject,
    /// Drop the oldest pending sample to make room
    EvictOldest,
}

/// Result of a successful push
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PushOutcome {
    /// Sample appended
    Queued,
    /// Sample appended after dropping the returned oldest sample
    Evicted(TelemetrySample),
}

/// Bounded FIFO of telemetry samples.
///
/// `write_count` counts accepted samples and `read_count` counts samples that
/// left the queue, either drained to a sink or evicted. `pending()` is always
/// `write_count - read_count` and never exceeds the capacity.
#[derive(Debug)]
pub struct TelemetryQueue {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
    policy: OverflowPolicy,
    write_count: u64,
    read_count: u64,
    evicted_count: u64,
    rejected_count: u64,
}

impl TelemetryQueue {
    /// Create a queue with the given capacity and overflow policy
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        assert!(capacity > 0, "Queue capacity must be > 0");
        info!(
            "Creating telemetry queue: capacity={}, policy={:?}",
            capacity, policy
        );
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            policy,
            write_count: 0,
            read_count: 0,
            evicted_count: 0,
            rejected_count: 0,
        }
    }

    /// Create a rejecting queue with default capacity (100 samples)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY, OverflowPolicy::default())
    }

    /// Append a sample, applying the overflow policy when full
    pub fn push(&mut self, sample: TelemetrySample) -> Result<PushOutcome, QueueError> {
        let mut outcome = PushOutcome::Queued;

        if self.is_full() {
            match self.policy {
                OverflowPolicy::Reject => {
                    self.rejected_count += 1;
                    metrics::counter!("telemetry_samples_rejected_total").increment(1);
                    warn!("Telemetry queue full, rejecting sample");
                    return Err(QueueError::QueueFull {
                        capacity: self.capacity,
                    });
                }
                OverflowPolicy::EvictOldest => {
                    if let Some(oldest) = self.samples.pop_front() {
                        self.read_count += 1;
                        self.evicted_count += 1;
                        metrics::counter!("telemetry_samples_evicted_total").increment(1);
                        warn!("Telemetry queue full, evicted oldest sample");
                        outcome = PushOutcome::Evicted(oldest);
                    }
                }
            }
        }

        self.samples.push_back(sample);
        self.write_count += 1;
        metrics::counter!("telemetry_samples_written_total").increment(1);
        self.record_pending();
        Ok(outcome)
    }

    /// Oldest pending sample, if any
    pub fn peek(&self) -> Option<&TelemetrySample> {
        self.samples.front()
    }

    /// Remove the oldest pending sample
    pub fn pop(&mut self) -> Option<TelemetrySample> {
        let sample = self.samples.pop_front()?;
        self.read_count += 1;
        metrics::counter!("telemetry_samples_read_total").increment(1);
        self.record_pending();
        Some(sample)
    }

    /// Drain every pending sample into `sink`, oldest first.
    ///
    /// A sample is removed only after the sink accepted it. On failure the
    /// remaining samples stay queued and the error is returned, so the next
    /// drain resumes with the sample that failed. Returns the number of
    /// samples drained.
    pub fn drain_to(&mut self, sink: &mut dyn TelemetrySink) -> Result<usize, PersistenceError> {
        let mut drained = 0;
        while let Some(sample) = self.peek().copied() {
            sink.persist(&sample)?;
            self.pop();
            drained += 1;
        }
        if drained > 0 {
            debug!("Drained {} telemetry samples", drained);
        }
        Ok(drained)
    }

    /// Samples produced but not yet consumed
    pub fn pending(&self) -> usize {
        let pending = (self.write_count - self.read_count) as usize;
        debug_assert_eq!(pending, self.samples.len());
        pending
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Check if queue is full
    pub fn is_full(&self) -> bool {
        self.pending() >= self.capacity
    }

    /// Get the queue capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the overflow policy
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Total samples accepted
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Total samples removed (drained or evicted)
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// Total samples dropped by [`OverflowPolicy::EvictOldest`]
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Total samples refused by [`OverflowPolicy::Reject`]
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    fn record_pending(&self) {
        metrics::gauge!("telemetry_queue_pending").set(self.samples.len() as f64);
    }
}

impl Default for TelemetryQueue {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use proptest::prelude::*;

    fn sample(speed: f64) -> TelemetrySample {
        TelemetrySample::new(speed, 0.5, 0.1)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = TelemetryQueue::new(10, OverflowPolicy::Reject);
        for i in 0..3 {
            queue.push(sample(i as f64)).unwrap();
        }

        assert_eq!(queue.pop().unwrap().speed, 0.0);
        assert_eq!(queue.pop().unwrap().speed, 1.0);
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_five_pushes_two_pops_leaves_three() {
        let mut queue = TelemetryQueue::with_default_capacity();
        for i in 0..5 {
            queue.push(sample(i as f64)).unwrap();
        }
        queue.pop();
        queue.pop();

        assert_eq!(queue.write_count(), 5);
        assert_eq!(queue.read_count(), 2);
        assert_eq!(queue.pending(), 3);
    }

    #[test]
    fn test_reject_when_full() {
        let mut queue = TelemetryQueue::new(2, OverflowPolicy::Reject);
        queue.push(sample(1.0)).unwrap();
        queue.push(sample(2.0)).unwrap();

        assert_eq!(
            queue.push(sample(3.0)),
            Err(QueueError::QueueFull { capacity: 2 })
        );
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.write_count(), 2);
        assert_eq!(queue.rejected_count(), 1);
        assert_eq!(queue.peek().unwrap().speed, 1.0);
    }

    #[test]
    fn test_evict_oldest_when_full() {
        let mut queue = TelemetryQueue::new(2, OverflowPolicy::EvictOldest);
        queue.push(sample(1.0)).unwrap();
        queue.push(sample(2.0)).unwrap();

        let outcome = queue.push(sample(3.0)).unwrap();
        assert_eq!(outcome, PushOutcome::Evicted(sample(1.0)));
        assert_eq!(queue.pending(), 2);
        assert_eq!(queue.write_count(), 3);
        assert_eq!(queue.read_count(), 1);
        assert_eq!(queue.evicted_count(), 1);
        assert_eq!(queue.peek().unwrap().speed, 2.0);
    }

    #[test]
    fn test_drain_to_sink() {
        let mut queue = TelemetryQueue::with_default_capacity();
        for i in 0..4 {
            queue.push(sample(i as f64)).unwrap();
        }
        let mut sink = MemorySink::new();

        assert_eq!(queue.drain_to(&mut sink).unwrap(), 4);
        assert!(queue.is_empty());
        assert_eq!(sink.samples.len(), 4);
        assert_eq!(sink.samples[3].speed, 3.0);
    }

    #[test]
    fn test_drain_empty_is_noop() {
        let mut queue = TelemetryQueue::with_default_capacity();
        let mut sink = MemorySink::new();

        assert_eq!(queue.drain_to(&mut sink).unwrap(), 0);
        assert_eq!(queue.drain_to(&mut sink).unwrap(), 0);
        assert_eq!(queue.read_count(), 0);
        assert!(sink.samples.is_empty());
    }

    #[test]
    fn test_failed_drain_keeps_sample() {
        let mut queue = TelemetryQueue::with_default_capacity();
        queue.push(sample(1.0)).unwrap();
        queue.push(sample(2.0)).unwrap();
        let mut sink = MemorySink {
            fail_next: 1,
            ..Default::default()
        };

        assert!(queue.drain_to(&mut sink).is_err());
        assert_eq!(queue.pending(), 2);

        // Retried on the next cycle, order preserved
        assert_eq!(queue.drain_to(&mut sink).unwrap(), 2);
        assert_eq!(sink.samples[0].speed, 1.0);
        assert_eq!(sink.samples[1].speed, 2.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Pop,
        Drain,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Push), Just(Op::Pop), Just(Op::Drain)]
    }

    proptest! {
        #[test]
        fn prop_pending_is_write_minus_read(
            ops in proptest::collection::vec(op(), 0..300),
            evict in any::<bool>(),
        ) {
            let policy = if evict { OverflowPolicy::EvictOldest } else { OverflowPolicy::Reject };
            let mut queue = TelemetryQueue::new(8, policy);
            let mut sink = MemorySink::new();

            for op in ops {
                match op {
                    Op::Push => { let _ = queue.push(sample(1.0)); }
                    Op::Pop => { queue.pop(); }
                    Op::Drain => { queue.drain_to(&mut sink).unwrap(); }
                }
                prop_assert!(queue.read_count() <= queue.write_count());
                prop_assert_eq!(queue.pending() as u64, queue.write_count() - queue.read_count());
                prop_assert!(queue.pending() <= queue.capacity());
            }
        }
    }
}
