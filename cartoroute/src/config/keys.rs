//! Addressable configuration keys.
//!
//! Every setting is reachable as `section.key`, which is how the file is
//! read and written and how the `config get/set/list` commands address it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::route::is_table_name;

use super::{ConfigError, ConfigFile};

/// A single configuration setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    RendererProgram,
    RendererArgs,
    RendererWorkers,
    RendererArtifactDir,
    DatabaseUrl,
    DatabaseRoadTable,
    DatabaseEdgeTable,
    DatabaseVertexTable,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys, grouped by section in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::RendererProgram,
            ConfigKey::RendererArgs,
            ConfigKey::RendererWorkers,
            ConfigKey::RendererArtifactDir,
            ConfigKey::DatabaseUrl,
            ConfigKey::DatabaseRoadTable,
            ConfigKey::DatabaseEdgeTable,
            ConfigKey::DatabaseVertexTable,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::RendererProgram
            | ConfigKey::RendererArgs
            | ConfigKey::RendererWorkers
            | ConfigKey::RendererArtifactDir => "renderer",
            ConfigKey::DatabaseUrl
            | ConfigKey::DatabaseRoadTable
            | ConfigKey::DatabaseEdgeTable
            | ConfigKey::DatabaseVertexTable => "database",
            ConfigKey::LoggingLevel | ConfigKey::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::RendererProgram => "program",
            ConfigKey::RendererArgs => "args",
            ConfigKey::RendererWorkers => "workers",
            ConfigKey::RendererArtifactDir => "artifact_dir",
            ConfigKey::DatabaseUrl => "url",
            ConfigKey::DatabaseRoadTable => "road_table",
            ConfigKey::DatabaseEdgeTable => "edge_table",
            ConfigKey::DatabaseVertexTable => "vertex_table",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Unset optional values are empty, except an
    /// unset worker count which reads `auto`.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::RendererProgram => path_text(&config.renderer.program),
            ConfigKey::RendererArgs => config.renderer.args.join(" "),
            ConfigKey::RendererWorkers => match config.renderer.workers {
                Some(count) => count.to_string(),
                None => "auto".to_string(),
            },
            ConfigKey::RendererArtifactDir => config.renderer.artifact_dir.display().to_string(),
            ConfigKey::DatabaseUrl => config.database.url.clone().unwrap_or_default(),
            ConfigKey::DatabaseRoadTable => config.database.road_table.clone(),
            ConfigKey::DatabaseEdgeTable => config.database.edge_table.clone(),
            ConfigKey::DatabaseVertexTable => config.database.vertex_table.clone(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingDirectory => path_text(&config.logging.directory),
        }
    }

    /// Validate `value` and store it. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::RendererProgram => config.renderer.program = optional_path(value),
            ConfigKey::RendererArgs => {
                config.renderer.args = value.split_whitespace().map(str::to_string).collect();
            }
            ConfigKey::RendererWorkers => config.renderer.workers = self.parse_workers(value)?,
            ConfigKey::RendererArtifactDir => {
                if value.is_empty() {
                    return Err(self.invalid(value, "a directory is required"));
                }
                config.renderer.artifact_dir = PathBuf::from(value);
            }
            ConfigKey::DatabaseUrl => {
                config.database.url = (!value.is_empty()).then(|| value.to_string());
            }
            ConfigKey::DatabaseRoadTable => config.database.road_table = self.table(value)?,
            ConfigKey::DatabaseEdgeTable => config.database.edge_table = self.table(value)?,
            ConfigKey::DatabaseVertexTable => config.database.vertex_table = self.table(value)?,
            ConfigKey::LoggingLevel => {
                if value.is_empty() {
                    return Err(self.invalid(value, "a level such as 'info' is required"));
                }
                config.logging.level = value.to_string();
            }
            ConfigKey::LoggingDirectory => config.logging.directory = optional_path(value),
        }
        Ok(())
    }

    fn parse_workers(&self, value: &str) -> Result<Option<usize>, ConfigError> {
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        match value.parse::<usize>() {
            Ok(0) => Err(self.invalid(value, "at least one worker is required")),
            Ok(count) => Ok(Some(count)),
            Err(_) => Err(self.invalid(value, "expected a number or 'auto'")),
        }
    }

    fn table(&self, value: &str) -> Result<String, ConfigError> {
        if is_table_name(value) {
            Ok(value.to_string())
        } else {
            Err(self.invalid(value, "expected a table name such as 'schema.table'"))
        }
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn path_text(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}
