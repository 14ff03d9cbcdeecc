//! Loading and saving the INI configuration file.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::debug;

use crate::render::DispatcherConfig;
use crate::route::RoadTables;

use super::{ConfigError, ConfigKey};

/// Directory holding the configuration file.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cartoroute")
}

/// Default location of the configuration file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default directory for the render workers' image artifacts.
pub fn default_artifact_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cartoroute")
        .join("artifacts")
}

/// `[renderer]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    /// Worker executable. `None` runs this program's own stand-in worker.
    pub program: Option<PathBuf>,
    /// Extra arguments placed before the worker index.
    pub args: Vec<String>,
    /// Number of workers. `None` uses the host's available parallelism.
    pub workers: Option<usize>,
    pub artifact_dir: PathBuf,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            workers: None,
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL.
    pub url: Option<String>,
    pub road_table: String,
    pub edge_table: String,
    pub vertex_table: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let tables = RoadTables::default();
        Self {
            url: None,
            road_table: tables.roads,
            edge_table: tables.edges,
            vertex_table: tables.vertices,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Default filter directive, e.g. `info` or `cartoroute=debug`.
    pub level: String,
    /// Directory for a log file in addition to stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub renderer: RendererSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()))
            {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        debug!(path = %path.display(), "Config file saved");
        Ok(())
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }

    /// Dispatcher settings from the `[renderer]` section.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let config = DispatcherConfig::new(&self.renderer.artifact_dir);
        match self.renderer.workers {
            Some(count) => config.with_worker_count(count),
            None => config,
        }
    }

    /// Table names from the `[database]` section.
    pub fn road_tables(&self) -> RoadTables {
        RoadTables {
            roads: self.database.road_table.clone(),
            edges: self.database.edge_table.clone(),
            vertices: self.database.vertex_table.clone(),
        }
    }
}
