//! Worker command - serve render requests over stdin/stdout.
//!
//! This is the process the dispatcher launches when no external renderer is
//! configured. It draws placeholder tiles.

use std::io;
use std::path::Path;

use cartoroute::render::{serve_worker, PlaceholderRenderer};

use crate::error::CliError;
use crate::logging;

/// Default log level for worker processes; `RUST_LOG` overrides it.
const WORKER_LOG_LEVEL: &str = "warn";

pub fn run(index: usize, artifact: &Path) -> Result<(), CliError> {
    let _guard = logging::init(WORKER_LOG_LEVEL, None)?;

    let renderer = PlaceholderRenderer::new();
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_worker(index, artifact, &renderer, stdin.lock(), stdout.lock())?;
    Ok(())
}
