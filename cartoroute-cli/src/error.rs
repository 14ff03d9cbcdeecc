//! CLI error type.

use std::io;
use std::path::PathBuf;

use cartoroute::config::ConfigError;
use cartoroute::geo::GeoError;
use cartoroute::render::RenderError;
use cartoroute::route::{GatewayError, PlanError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Bad settings or arguments, with a message for the user.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("All {workers} render workers exited with {remaining} tiles outstanding")]
    WorkersExited { workers: usize, remaining: u64 },

    #[error("Failed to write tile image {path:?}: {source}")]
    TileImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
