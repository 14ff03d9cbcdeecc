//! Atomic dispatcher counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::DispatchSnapshot;

/// Counters describing the life of rendering tasks.
///
/// Every task that is submitted ends up in exactly one of `completed`,
/// `failed` or `discarded`, or is still pending / in flight.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    workers_lost: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DispatchMetrics {
    /// Create a zeroed set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A task entered the queue.
    pub fn task_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A task is about to be written to a worker.
    pub fn task_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    /// A dispatched task never reached a live worker and went back to the
    /// queue. Undoes [`task_dispatched`](Self::task_dispatched).
    pub fn dispatch_returned(&self) {
        self.leave_flight();
        let _ = self
            .dispatched
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// A worker reported a finished tile and its artifact was loaded.
    pub fn task_completed(&self) {
        self.leave_flight();
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker reported completion but the result could not be used.
    pub fn completion_failed(&self) {
        self.leave_flight();
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Tasks removed from the queue without being dispatched.
    pub fn tasks_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// A worker closed its output; its slot never returns to the pool.
    pub fn worker_lost(&self) {
        self.workers_lost.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of tasks currently handed to workers.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            workers_lost: self.workers_lost.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
        }
    }

    fn leave_flight(&self) {
        // Saturate so a stray completion line cannot wrap the gauge
        let _ = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}
