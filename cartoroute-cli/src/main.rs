//! Cartoroute CLI - Command-line interface
//!
//! Renders map tiles through a pool of worker processes and plans routes
//! over a road network. The same binary doubles as the stand-in render
//! worker (`cartoroute worker`).

mod commands;
mod error;
mod logging;
mod runner;

use std::path::PathBuf;

use cartoroute::config::config_file_path;
use cartoroute::geo::{ProjectedPoint, TileCoord};
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::render::RenderArgs;
use commands::route::RouteArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "cartoroute")]
#[command(about = "Map tile rendering and road-network routing", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/cartoroute/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render map tiles to DIR/Z/X/Y.png
    Render {
        /// Zoom level
        #[arg(long, short)]
        zoom: u32,

        /// Tile to render as X:Y; repeat for more (default: the whole grid)
        #[arg(long = "tile", value_name = "X:Y")]
        tiles: Vec<TileCoord>,

        /// Number of worker processes (overrides renderer.workers)
        #[arg(long)]
        workers: Option<usize>,

        /// Output directory
        #[arg(long, short, default_value = "tiles")]
        output: PathBuf,
    },

    /// Plan a driving route between two projected points
    Route {
        /// Start point as X,Y in EPSG:3857 meters
        #[arg(long, allow_hyphen_values = true, value_name = "X,Y")]
        from: ProjectedPoint,

        /// End point as X,Y in EPSG:3857 meters
        #[arg(long, allow_hyphen_values = true, value_name = "X,Y")]
        to: ProjectedPoint,

        /// Road network JSON file (default: the configured database)
        #[arg(long, value_name = "FILE")]
        graph: Option<PathBuf>,
    },

    /// Find the closest point on any road
    Nearest {
        /// Point as X,Y in EPSG:3857 meters
        #[arg(long, allow_hyphen_values = true, value_name = "X,Y")]
        at: ProjectedPoint,

        /// Road network JSON file (default: the configured database)
        #[arg(long, value_name = "FILE")]
        graph: Option<PathBuf>,
    },

    /// Serve render requests on stdin/stdout (launched by the dispatcher)
    #[command(hide = true)]
    Worker {
        /// Worker index in the pool
        index: usize,

        /// Path the rendered image is written to
        artifact: PathBuf,
    },

    /// Create the configuration file
    Init,

    /// View or change configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.unwrap_or_else(config_file_path);

    match cli.command {
        Commands::Worker { index, artifact } => commands::worker::run(index, &artifact),
        Commands::Init => commands::init::run(&config_path),
        Commands::Config(command) => commands::config::run(command, &config_path),
        Commands::Render {
            zoom,
            tiles,
            workers,
            output,
        } => {
            let runner = CliRunner::new(&config_path)?;
            runner.log_startup("render");
            commands::render::run(
                &runner,
                RenderArgs {
                    zoom,
                    tiles,
                    workers,
                    output,
                },
            )
        }
        Commands::Route { from, to, graph } => {
            let runner = CliRunner::new(&config_path)?;
            runner.log_startup("route");
            commands::route::run_route(&runner, RouteArgs { from, to, graph })
        }
        Commands::Nearest { at, graph } => {
            let runner = CliRunner::new(&config_path)?;
            runner.log_startup("nearest");
            commands::route::run_nearest(&runner, at, graph)
        }
    }
}
