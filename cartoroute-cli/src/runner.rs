//! Shared setup for commands that read the configuration file.

use std::path::{Path, PathBuf};

use cartoroute::config::ConfigFile;
use cartoroute::render::ProcessLauncher;
use cartoroute::route::{InMemoryGateway, SpatialGateway};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::error::CliError;
use crate::logging;

/// Argument that puts this binary into worker mode.
pub const WORKER_COMMAND: &str = "worker";

/// Loaded configuration plus the logging guard for one command invocation.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    _log_guard: Option<WorkerGuard>,
}

impl CliRunner {
    /// Load the configuration file at `config_path` and install logging.
    pub fn new(config_path: &Path) -> Result<Self, CliError> {
        let config = ConfigFile::load_from(config_path)?;
        let log_guard = logging::init(&config.logging.level, config.logging.directory.as_deref())?;

        Ok(Self {
            config,
            config_path: config_path.to_path_buf(),
            _log_guard: log_guard,
        })
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            config = %self.config_path.display(),
            "cartoroute starting"
        );
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Launcher for the configured worker program.
    ///
    /// Without a configured program, workers are this executable running
    /// its built-in placeholder renderer and `renderer.args` is ignored.
    pub fn launcher(&self) -> Result<ProcessLauncher, CliError> {
        let renderer = &self.config.renderer;
        match &renderer.program {
            Some(program) => Ok(ProcessLauncher::new(program).with_args(renderer.args.clone())),
            None => {
                let exe = std::env::current_exe()?;
                Ok(ProcessLauncher::new(exe).with_args([WORKER_COMMAND]))
            }
        }
    }

    /// Road network gateway: a JSON graph file when given, otherwise the
    /// configured database.
    pub fn open_gateway(&self, graph: Option<&Path>) -> Result<Box<dyn SpatialGateway>, CliError> {
        if let Some(path) = graph {
            let gateway = InMemoryGateway::load(path)?;
            info!(
                path = %path.display(),
                vertices = gateway.vertex_count(),
                edges = gateway.edge_count(),
                "Loaded road network"
            );
            return Ok(Box::new(gateway));
        }

        self.open_database()
    }

    #[cfg(feature = "postgis")]
    fn open_database(&self) -> Result<Box<dyn SpatialGateway>, CliError> {
        use cartoroute::route::PostgisGateway;

        let url = self.config.database.url.as_deref().ok_or_else(|| {
            CliError::Config(
                "No road network: pass --graph FILE or set database.url \
                 (cartoroute config set database.url postgres://...)"
                    .to_string(),
            )
        })?;
        let gateway = PostgisGateway::connect(url, self.config.road_tables())?;
        Ok(Box::new(gateway))
    }

    #[cfg(not(feature = "postgis"))]
    fn open_database(&self) -> Result<Box<dyn SpatialGateway>, CliError> {
        Err(CliError::Config(
            "Built without PostGIS support: pass --graph FILE".to_string(),
        ))
    }
}
