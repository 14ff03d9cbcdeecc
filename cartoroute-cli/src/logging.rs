//! Tracing subscriber setup.
//!
//! Logs always go to stderr: in worker mode stdout carries the render
//! protocol. A log file is added when a directory is configured.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::CliError;

/// Name of the log file inside the configured log directory.
pub const LOG_FILE_NAME: &str = "cartoroute.log";

/// Install the global subscriber.
///
/// `level` is an `EnvFilter` directive used when `RUST_LOG` is not set.
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init(level: &str, directory: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Config(format!("Invalid log level '{}': {}", level, e)))?,
    };

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(LocalTime::rfc_3339());

    let (file_layer, guard) = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(guard)
}
