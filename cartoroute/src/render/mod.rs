//! Tile rendering dispatch over a pool of worker processes.
//!
//! The cartography engine behind the map can only serve one rendering call
//! per process (it holds a single database connection), so parallel tile
//! rendering needs a pool of *processes*. This module owns that pool and a
//! FIFO queue of pending tasks, and matches one to the other.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                         RenderDispatcher                           │
//! │                                                                    │
//! │  submit() ──► TaskQueue ──┐                                        │
//! │  clear()  ──►  (FIFO)     │                                        │
//! │                           ▼                                        │
//! │               dispatch loop: acquire slot ◄── WorkerPool (free)    │
//! │                           │       pop task          ▲              │
//! │                           ▼                         │ release      │
//! │               7 request lines ──► worker N stdin    │              │
//! │                                                     │              │
//! │               worker N stdout ──► completion reader ┘              │
//! │                    "x y zoom"        │ load artifact N             │
//! │                                      ▼                             │
//! │                                 TileSink::tile_rendered            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cartoroute::geo::TileCoord;
//! use cartoroute::render::{DispatcherConfig, ProcessLauncher, RenderDispatcher, RenderTask, RenderedTile};
//!
//! let launcher = ProcessLauncher::new("/usr/local/bin/tile-worker");
//! let config = DispatcherConfig::new("/tmp/artifacts").with_worker_count(4);
//!
//! let dispatcher = RenderDispatcher::start(config, &launcher, |tile: RenderedTile| {
//!     println!("rendered {} at zoom {}", tile.tile, tile.zoom);
//! })?;
//!
//! dispatcher.submit(RenderTask::for_tile(TileCoord::new(0, 0), 1)?)?;
//! ```

mod dispatcher;
mod error;
mod launcher;
mod pool;
pub mod protocol;
mod queue;
mod task;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{default_worker_count, DispatcherConfig, RenderDispatcher, TileSink};
pub use error::RenderError;
pub use launcher::{artifact_path, ProcessLauncher, WorkerChannels, WorkerLauncher};
pub use pool::WorkerPool;
pub use queue::TaskQueue;
pub use task::{RenderTask, RenderedTile};
pub use worker::{error_placeholder, serve_worker, PlaceholderRenderer, TileRenderer};
