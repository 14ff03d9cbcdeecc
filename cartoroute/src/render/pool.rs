//! Pool of free render worker slots.
//!
//! A slot is the index of a worker process. At most one task is in flight
//! per slot: the dispatch loop acquires a slot before handing out a task and
//! the completion reader of that worker releases it once the tile is
//! delivered. Slots are reused for the lifetime of the dispatcher, except
//! for slots whose worker has exited: those are retired and never handed out
//! again.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::warn;

struct PoolState {
    free: VecDeque<usize>,
    retired: Vec<bool>,
    live: usize,
    closed: bool,
}

/// Blocking pool of worker slots `0..capacity`.
pub struct WorkerPool {
    state: Mutex<PoolState>,
    released: Condvar,
    capacity: usize,
}

impl WorkerPool {
    /// Creates a pool with every slot free.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                free: (0..capacity).collect(),
                retired: vec![false; capacity],
                live: capacity,
                closed: false,
            }),
            released: Condvar::new(),
            capacity,
        }
    }

    /// Takes a free slot, suspending until one is released.
    ///
    /// Returns `None` once the pool is closed or every slot is retired.
    pub fn acquire(&self) -> Option<usize> {
        let mut state = self.state.lock();
        loop {
            if state.closed || state.live == 0 {
                return None;
            }
            if let Some(slot) = state.free.pop_front() {
                return Some(slot);
            }
            self.released.wait(&mut state);
        }
    }

    /// Takes a free slot if one is available right now.
    pub fn try_acquire(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.free.pop_front()
    }

    /// Returns a slot to the pool and wakes one waiter.
    pub fn release(&self, slot: usize) {
        let mut state = self.state.lock();
        if slot >= self.capacity || state.free.contains(&slot) {
            warn!(slot, "Ignoring release of a worker slot that is not in use");
            return;
        }
        if state.retired[slot] {
            return;
        }
        state.free.push_back(slot);
        self.released.notify_one();
    }

    /// Takes a slot out of service for good. A later `release` of it is
    /// ignored. Once no live slot remains, waiters are woken and `acquire`
    /// returns `None`.
    ///
    /// Returns `false` if the slot was already retired.
    pub fn retire(&self, slot: usize) -> bool {
        let mut state = self.state.lock();
        if slot >= self.capacity || state.retired[slot] {
            return false;
        }
        state.retired[slot] = true;
        state.live -= 1;
        state.free.retain(|&free| free != slot);
        if state.live == 0 {
            self.released.notify_all();
        }
        true
    }

    /// Returns true if `slot` has been retired.
    pub fn is_retired(&self, slot: usize) -> bool {
        self.state.lock().retired.get(slot).copied().unwrap_or(false)
    }

    /// Closes the pool and wakes every waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.released.notify_all();
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots not retired.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("available", &state.free.len())
            .field("live", &state.live)
            .field("closed", &state.closed)
            .finish()
    }
}
