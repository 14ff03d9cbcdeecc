//! The render dispatcher.
//!
//! Owns the task queue, the worker pool and the threads that connect them:
//!
//! - one dispatch loop that waits for a free worker, then takes the oldest
//!   pending task and writes it to that worker;
//! - one completion reader per worker that waits for the worker's `x y zoom`
//!   line, loads the artifact, hands the tile to the [`TileSink`] and returns
//!   the worker to the pool.
//!
//! The dispatch loop takes a slot *before* it pops a task, so a task never
//! sits outside the queue waiting for a worker. Clearing the queue therefore
//! removes every task that has not been written to a worker yet.
//!
//! A worker that closes its output is retired from the pool. A task that was
//! handed to its slot but could not reach it goes back to the head of the
//! queue for the remaining workers.

use std::io::{BufRead, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::telemetry::{DispatchMetrics, DispatchSnapshot};

use super::launcher::{artifact_path, WorkerLauncher};
use super::protocol::{self, TileCompletion};
use super::{RenderError, RenderTask, RenderedTile, TaskQueue, WorkerPool};

/// Receives finished tiles.
///
/// Called from the completion reader thread of the worker that rendered the
/// tile, so implementations must be cheap or hand off to another thread.
pub trait TileSink: Send + Sync + 'static {
    fn tile_rendered(&self, tile: RenderedTile);
}

impl<F> TileSink for F
where
    F: Fn(RenderedTile) + Send + Sync + 'static,
{
    fn tile_rendered(&self, tile: RenderedTile) {
        self(tile)
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Settings for [`RenderDispatcher::start`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    artifact_dir: PathBuf,
    worker_count: usize,
}

impl DispatcherConfig {
    /// Create a configuration with one worker per available CPU.
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            worker_count: default_worker_count(),
        }
    }

    /// Set the number of worker processes.
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Directory that receives the per-worker image artifacts.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.worker_count == 0 {
            return Err(RenderError::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host parallelism, falling back to a single worker.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

// =============================================================================
// Dispatcher
// =============================================================================

/// State shared by the dispatcher handle and its threads.
struct Shared {
    queue: TaskQueue,
    pool: WorkerPool,
    metrics: DispatchMetrics,
    /// Whether each worker has a task written to it and not yet answered.
    busy: Vec<AtomicBool>,
}

/// Dispatches rendering tasks to a fixed pool of worker processes.
///
/// At most one task is in flight per worker. Tasks are dispatched in
/// submission order; completions are delivered in whatever order the workers
/// finish.
pub struct RenderDispatcher {
    shared: Arc<Shared>,
    dispatch_thread: Option<JoinHandle<()>>,
    processes: Vec<Child>,
    worker_count: usize,
}

impl RenderDispatcher {
    /// Start every worker and the dispatch machinery.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, the artifact directory cannot
    /// be created, or any worker fails to start. Workers already started are
    /// stopped again; there is no partial pool.
    pub fn start<L, S>(config: DispatcherConfig, launcher: &L, sink: S) -> Result<Self, RenderError>
    where
        L: WorkerLauncher + ?Sized,
        S: TileSink,
    {
        config.validate()?;
        std::fs::create_dir_all(config.artifact_dir())?;

        let count = config.worker_count();
        let mut launched = Vec::with_capacity(count);
        for index in 0..count {
            let artifact = artifact_path(config.artifact_dir(), index);
            match launcher.launch(index, &artifact) {
                Ok(channels) => launched.push((channels, artifact)),
                Err(e) => {
                    error!(worker = index, error = %e, "Render worker failed to start");
                    for (channels, _) in launched {
                        if let Some(mut child) = channels.process {
                            let _ = child.kill();
                            let _ = child.wait();
                        }
                    }
                    return Err(e);
                }
            }
        }

        let shared = Arc::new(Shared {
            queue: TaskQueue::new(),
            pool: WorkerPool::new(count),
            metrics: DispatchMetrics::new(),
            busy: (0..count).map(|_| AtomicBool::new(false)).collect(),
        });
        let sink: Arc<dyn TileSink> = Arc::new(sink);

        let mut inputs = Vec::with_capacity(count);
        let mut readers = Vec::with_capacity(count);
        let mut processes = Vec::new();
        for (index, (channels, artifact)) in launched.into_iter().enumerate() {
            inputs.push(channels.input);
            readers.push((index, channels.output, artifact));
            processes.extend(channels.process);
        }

        // From here on, dropping the dispatcher tears the workers down
        let mut dispatcher = Self {
            shared,
            dispatch_thread: None,
            processes,
            worker_count: count,
        };

        for (index, output, artifact) in readers {
            let shared = Arc::clone(&dispatcher.shared);
            let sink = Arc::clone(&sink);
            // Detached: exits when the worker closes its output
            thread::Builder::new()
                .name(format!("render-completion-{}", index))
                .spawn(move || completion_loop(index, output, artifact, shared, sink))?;
        }

        let shared = Arc::clone(&dispatcher.shared);
        dispatcher.dispatch_thread = Some(
            thread::Builder::new()
                .name("render-dispatch".to_string())
                .spawn(move || dispatch_loop(shared, inputs))?,
        );

        info!(
            workers = count,
            artifact_dir = %config.artifact_dir().display(),
            "Render dispatcher started"
        );
        Ok(dispatcher)
    }

    /// Queue a task for rendering. Never blocks on the workers.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Stopped` after [`shutdown`](Self::shutdown).
    pub fn submit(&self, task: RenderTask) -> Result<(), RenderError> {
        let tile = task.tile();
        let zoom = task.zoom();
        self.shared
            .queue
            .push(task)
            .map_err(|_| RenderError::Stopped)?;
        self.shared.metrics.task_submitted();
        debug!(tile = %tile, zoom, "Render task queued");
        Ok(())
    }

    /// Drop every task not yet written to a worker.
    ///
    /// Tasks already in flight still complete and reach the sink.
    pub fn clear(&self) -> usize {
        let discarded = self.shared.queue.clear();
        self.shared.metrics.tasks_discarded(discarded);
        if discarded > 0 {
            debug!(discarded, "Render queue cleared");
        }
        discarded
    }

    /// Stop dispatching. Pending tasks are discarded and the workers' input
    /// is closed. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.dispatch_thread.take() else {
            return;
        };

        let discarded = self.shared.queue.close();
        self.shared.metrics.tasks_discarded(discarded);
        self.shared.pool.close();

        if handle.join().is_err() {
            error!("Render dispatch thread panicked");
        }
        info!(discarded, metrics = %self.metrics(), "Render dispatcher stopped");
    }

    /// Current counters.
    pub fn metrics(&self) -> DispatchSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of queued tasks not yet dispatched.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }
}

impl Drop for RenderDispatcher {
    fn drop(&mut self) {
        self.shutdown();
        // Queue and pool may still be open if start failed part-way
        self.shared.queue.close();
        self.shared.pool.close();

        for child in &mut self.processes {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl std::fmt::Debug for RenderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDispatcher")
            .field("workers", &self.worker_count)
            .field("queue", &self.shared.queue)
            .field("pool", &self.shared.pool)
            .finish()
    }
}

// =============================================================================
// Threads
// =============================================================================

fn dispatch_loop(shared: Arc<Shared>, mut inputs: Vec<Box<dyn Write + Send>>) {
    debug!("Dispatch loop started");

    while let Some(slot) = shared.pool.acquire() {
        let Some((task, epoch)) = shared.queue.wait_take() else {
            shared.pool.release(slot);
            break;
        };

        shared.busy[slot].store(true, Ordering::Release);
        shared.metrics.task_dispatched();
        debug!(worker = slot, tile = %task.tile(), zoom = task.zoom(), "Dispatching tile");

        let written = protocol::write_request(inputs[slot].as_mut(), &task);
        if let Err(e) = &written {
            warn!(worker = slot, error = %e, "Failed to send task to render worker");
            shared.pool.retire(slot);
        }

        // A worker that exited while this slot was held has no reader left to
        // answer the task. Whoever clears `busy` first owns the outcome: the
        // reader counts a failure, this loop hands the task to another worker.
        if (written.is_err() || shared.pool.is_retired(slot))
            && shared.busy[slot].swap(false, Ordering::AcqRel)
        {
            shared.metrics.dispatch_returned();
            let tile = task.tile();
            match shared.queue.requeue(task, epoch) {
                Ok(()) => debug!(worker = slot, tile = %tile, "Task returned to the queue"),
                Err(_) => shared.metrics.tasks_discarded(1),
            }
        }
    }

    // Dropping the inputs closes every worker's stdin
    drop(inputs);
    if shared.pool.live() == 0 && !shared.queue.is_closed() {
        error!(pending = shared.queue.len(), "Every render worker exited; dispatching stopped");
    }
    debug!("Dispatch loop stopped");
}

fn completion_loop(
    index: usize,
    mut output: Box<dyn BufRead + Send>,
    artifact: PathBuf,
    shared: Arc<Shared>,
    sink: Arc<dyn TileSink>,
) {
    let mut line = String::new();

    loop {
        line.clear();
        match output.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(worker = index, error = %e, "Failed to read from render worker");
                break;
            }
        }

        shared.busy[index].store(false, Ordering::Release);
        match load_completion(&line, &artifact, index) {
            Ok(tile) => {
                debug!(worker = index, tile = %tile.tile, zoom = tile.zoom, "Tile rendered");
                shared.metrics.task_completed();
                sink.tile_rendered(tile);
            }
            Err(e) => {
                warn!(worker = index, error = %e, "Discarding unusable tile completion");
                shared.metrics.completion_failed();
            }
        }
        shared.pool.release(index);
    }

    shared.pool.retire(index);
    if shared.busy[index].swap(false, Ordering::AcqRel) {
        shared.metrics.completion_failed();
    }
    shared.metrics.worker_lost();

    if shared.queue.is_closed() {
        debug!(worker = index, "Render worker exited");
    } else {
        error!(worker = index, "Render worker closed its output; slot removed from pool");
    }
}

fn load_completion(line: &str, artifact: &Path, worker: usize) -> Result<RenderedTile, RenderError> {
    let completion = TileCompletion::parse(line)?;
    let image = image::open(artifact).map_err(|e| RenderError::Artifact {
        path: artifact.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(RenderedTile {
        image,
        tile: completion.tile,
        zoom: completion.zoom,
        worker,
    })
}
