//! Scheduler statistics.
//!
//! Counters use atomics so producers, the batch former and dispatch tasks can
//! update them without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by every scheduler task.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Requests accepted by `submit`.
    pub requests_submitted: AtomicU64,

    /// Batches handed to the dispatcher.
    pub batches_formed: AtomicU64,

    /// Requests resolved with a vector.
    pub requests_completed: AtomicU64,

    /// Requests resolved with an error.
    pub requests_failed: AtomicU64,

    /// Cumulative per-batch average wait time in microseconds.
    pub total_wait_time_us: AtomicU64,

    /// Batches currently being dispatched.
    pub active_batches: AtomicU64,

    batch_size_sum: AtomicU64,
}

impl SchedulerStats {
    #[inline]
    pub fn record_submission(&self) {
        self.requests_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch handed to the dispatcher.
    ///
    /// # Arguments
    /// * `size` - Number of requests in the batch
    /// * `wait_time_us` - Average wait time of its members in microseconds
    #[inline]
    pub fn record_batch(&self, size: usize, wait_time_us: u64) {
        self.batches_formed.fetch_add(1, Ordering::Relaxed);
        self.batch_size_sum.fetch_add(size as u64, Ordering::Relaxed);
        self.total_wait_time_us
            .fetch_add(wait_time_us, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_outcomes(&self, succeeded: usize, failed: usize) {
        self.requests_completed
            .fetch_add(succeeded as u64, Ordering::Relaxed);
        self.requests_failed
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn dispatch_started(&self) {
        self.active_batches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn dispatch_finished(&self) {
        self.active_batches.fetch_sub(1, Ordering::Relaxed);
    }

    /// Snapshot of current counters. `queue_depth` must be filled by the caller.
    #[must_use]
    pub fn summary(&self) -> SchedulerStatsSummary {
        let batches = self.batches_formed.load(Ordering::Relaxed);
        let size_sum = self.batch_size_sum.load(Ordering::Relaxed);
        let wait_sum = self.total_wait_time_us.load(Ordering::Relaxed);

        SchedulerStatsSummary {
            requests_submitted: self.requests_submitted.load(Ordering::Relaxed),
            batches_formed: batches,
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            avg_batch_size: if batches > 0 {
                (size_sum as f64) / (batches as f64)
            } else {
                0.0
            },
            avg_wait_time_us: if batches > 0 { wait_sum / batches } else { 0 },
            queue_depth: 0,
            active_batches: self.active_batches.load(Ordering::Relaxed),
        }
    }
}

/// Non-atomic copy of [`SchedulerStats`] for reporting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchedulerStatsSummary {
    pub requests_submitted: u64,
    pub batches_formed: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub avg_batch_size: f64,
    pub avg_wait_time_us: u64,
    /// Requests waiting in the admission queue.
    pub queue_depth: usize,
    pub active_batches: u64,
}
