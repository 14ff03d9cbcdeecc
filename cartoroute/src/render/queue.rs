//! FIFO queue of pending rendering tasks.
//!
//! Tasks are handed out strictly in submission order. The queue is shared
//! between callers (which push and clear) and the dispatch loop (which
//! blocks waiting for work), so it carries its own lock and a condition
//! variable signalled whenever a task is added or the queue is closed.
//!
//! # Example
//!
//! ```
//! use cartoroute::geo::TileCoord;
//! use cartoroute::render::{RenderTask, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! queue.push(RenderTask::for_tile(TileCoord::new(0, 0), 1).unwrap()).unwrap();
//! queue.push(RenderTask::for_tile(TileCoord::new(1, 0), 1).unwrap()).unwrap();
//!
//! // Oldest task comes out first
//! assert_eq!(queue.wait_pop().unwrap().tile(), TileCoord::new(0, 0));
//! assert_eq!(queue.clear(), 1);
//! ```

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use super::RenderTask;

struct QueueState {
    tasks: VecDeque<RenderTask>,
    /// Bumped by every `clear`.
    epoch: u64,
    closed: bool,
}

/// Thread-safe FIFO of rendering tasks.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    task_added: Condvar,
}

impl TaskQueue {
    /// Creates a new empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                epoch: 0,
                closed: false,
            }),
            task_added: Condvar::new(),
        }
    }

    /// Appends a task and wakes one waiter. Never blocks on anything but the
    /// queue lock.
    ///
    /// Returns the task back if the queue has been closed.
    pub fn push(&self, task: RenderTask) -> Result<(), RenderTask> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(task);
        }
        state.tasks.push_back(task);
        self.task_added.notify_one();
        Ok(())
    }

    /// Removes and returns the oldest task, suspending until one is available.
    ///
    /// Returns `None` once the queue is closed.
    pub fn wait_pop(&self) -> Option<RenderTask> {
        self.wait_take().map(|(task, _)| task)
    }

    /// Like [`wait_pop`](Self::wait_pop), also returning the clear epoch the
    /// task was taken in. Pass the epoch to [`requeue`](Self::requeue) to put
    /// the task back.
    pub fn wait_take(&self) -> Option<(RenderTask, u64)> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(task) = state.tasks.pop_front() {
                return Some((task, state.epoch));
            }
            self.task_added.wait(&mut state);
        }
    }

    /// Puts a taken task back at the head of the queue.
    ///
    /// Returns the task back if the queue was cleared since `epoch` or has
    /// been closed; a cleared task must not come back.
    pub fn requeue(&self, task: RenderTask, epoch: u64) -> Result<(), RenderTask> {
        let mut state = self.state.lock();
        if state.closed || state.epoch != epoch {
            return Err(task);
        }
        state.tasks.push_front(task);
        self.task_added.notify_one();
        Ok(())
    }

    /// Removes and returns the oldest task without waiting.
    pub fn try_pop(&self) -> Option<RenderTask> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.tasks.pop_front()
    }

    /// Atomically removes every pending task. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.tasks.len();
        state.tasks.clear();
        state.epoch += 1;
        removed
    }

    /// Closes the queue, discarding pending tasks and waking every waiter.
    ///
    /// Returns the number of discarded tasks. Closing twice is harmless.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let discarded = state.tasks.len();
        state.tasks.clear();
        self.task_added.notify_all();
        discarded
    }

    /// Returns the number of pending tasks.
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Returns true if no task is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TaskQueue")
            .field("len", &state.tasks.len())
            .field("closed", &state.closed)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
