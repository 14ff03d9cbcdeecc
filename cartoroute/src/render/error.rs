//! Error types for tile rendering dispatch.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::geo::GeoError;

/// Errors raised by the dispatcher, the launcher and the worker loop.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A worker process could not be started. Fatal to pool construction.
    #[error("Failed to start render worker {index}: {source}")]
    WorkerStart {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to a worker failed.
    #[error("Render worker {index} I/O error: {source}")]
    WorkerIo {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// A protocol line could not be parsed.
    #[error("Malformed protocol data '{line}': {reason}")]
    Protocol { line: String, reason: String },

    /// The rendered image could not be written or read back.
    #[error("Tile artifact {path:?}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    /// The tile renderer itself failed.
    #[error("Renderer failed: {0}")]
    Renderer(String),

    /// The task does not describe a tile of the map grid.
    #[error("Invalid rendering task: {0}")]
    InvalidTask(#[from] GeoError),

    /// Invalid dispatcher configuration.
    #[error("Invalid dispatcher configuration: {0}")]
    Config(String),

    /// The dispatcher has been shut down.
    #[error("Render dispatcher is stopped")]
    Stopped,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
