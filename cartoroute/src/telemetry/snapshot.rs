//! Point-in-time copy of dispatcher counters.

use std::fmt;

/// Dispatcher counters captured at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub submitted: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded: u64,
    pub workers_lost: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

impl DispatchSnapshot {
    /// Tasks that reached a final state (completed, failed or discarded).
    pub fn settled(&self) -> u64 {
        self.completed + self.failed + self.discarded
    }
}

impl fmt::Display for DispatchSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "submitted={} dispatched={} completed={} failed={} discarded={} in_flight={} peak={}",
            self.submitted,
            self.dispatched,
            self.completed,
            self.failed,
            self.discarded,
            self.in_flight,
            self.peak_in_flight
        )
    }
}
