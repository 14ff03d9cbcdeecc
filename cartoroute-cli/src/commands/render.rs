//! Render command - render map tiles with a pool of worker processes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use cartoroute::geo::TileCoord;
use cartoroute::render::{RenderDispatcher, RenderTask, RenderedTile};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Highest zoom at which the whole grid may be rendered without `--tile`.
pub const MAX_GRID_ZOOM: u32 = 6;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for the render command.
pub struct RenderArgs {
    pub zoom: u32,
    pub tiles: Vec<TileCoord>,
    pub workers: Option<usize>,
    pub output: PathBuf,
}

enum Outcome {
    Finished,
    Interrupted { discarded: usize },
    WorkersExited,
}

/// Run the render command.
pub fn run(runner: &CliRunner, args: RenderArgs) -> Result<(), CliError> {
    let tiles = if args.tiles.is_empty() {
        if args.zoom > MAX_GRID_ZOOM {
            return Err(CliError::Config(format!(
                "Rendering the whole grid is limited to zoom {} and below. \
                 Choose tiles with --tile X:Y.",
                MAX_GRID_ZOOM
            )));
        }
        TileCoord::grid(args.zoom).collect()
    } else {
        args.tiles
    };
    let tasks = tiles
        .iter()
        .map(|&tile| RenderTask::for_tile(tile, args.zoom))
        .collect::<Result<Vec<_>, _>>()?;
    let total = tasks.len() as u64;

    let mut config = runner.config().dispatcher_config();
    if let Some(workers) = args.workers {
        config = config.with_worker_count(workers);
    }
    let launcher = runner.launcher()?;

    println!(
        "Rendering {} tiles at zoom {} with {} workers",
        total,
        args.zoom,
        config.worker_count()
    );
    println!("Output: {}", args.output.display());
    println!();

    let (sender, receiver) = mpsc::channel();
    let mut dispatcher = RenderDispatcher::start(config, &launcher, move |tile: RenderedTile| {
        let _ = sender.send(tile);
    })?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    for task in tasks {
        dispatcher.submit(task)?;
    }

    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .map_err(|e| CliError::Config(e.to_string()))?,
    );

    let mut written = 0u64;
    let outcome = loop {
        if interrupted.load(Ordering::SeqCst) {
            break Outcome::Interrupted {
                discarded: dispatcher.clear(),
            };
        }

        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(tile) => {
                write_tile(&args.output, &tile)?;
                written += 1;
                progress.inc(1);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break Outcome::WorkersExited,
        }

        let snapshot = dispatcher.metrics();
        if written + snapshot.failed >= total {
            break Outcome::Finished;
        }
        if snapshot.workers_lost as usize >= dispatcher.worker_count() {
            // Keep whatever finished before the last worker went away
            for tile in receiver.try_iter() {
                write_tile(&args.output, &tile)?;
                written += 1;
                progress.inc(1);
            }
            break Outcome::WorkersExited;
        }
    };

    dispatcher.shutdown();
    let snapshot = dispatcher.metrics();

    match outcome {
        Outcome::Finished => progress.finish_with_message("done"),
        Outcome::Interrupted { discarded } => {
            progress.abandon_with_message(format!("interrupted, {} queued tiles discarded", discarded))
        }
        Outcome::WorkersExited => {
            progress.abandon_with_message("workers exited");
            return Err(CliError::WorkersExited {
                workers: dispatcher.worker_count(),
                remaining: total.saturating_sub(written),
            });
        }
    }

    if snapshot.failed > 0 {
        warn!(failed = snapshot.failed, "Some tiles failed to render");
    }

    println!();
    println!("Tiles written: {}", written);
    println!("Dispatcher:    {}", snapshot);
    Ok(())
}

/// Write a rendered tile to `output/Z/X/Y.png`.
fn write_tile(output: &Path, tile: &RenderedTile) -> Result<PathBuf, CliError> {
    let dir = output
        .join(tile.zoom.to_string())
        .join(tile.tile.x.to_string());
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{}.png", tile.tile.y));
    tile.image
        .save(&path)
        .map_err(|source| CliError::TileImage {
            path: path.clone(),
            source,
        })?;

    debug!(tile = %tile.tile, zoom = tile.zoom, worker = tile.worker, path = %path.display(), "Tile written");
    Ok(path)
}
