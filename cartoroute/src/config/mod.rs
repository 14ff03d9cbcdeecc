//! Configuration file.
//!
//! Settings live in an INI file at `<config dir>/cartoroute/config.ini`.
//! A missing file means defaults; every key is optional.
//!
//! ```ini
//! [renderer]
//! program = /usr/local/bin/tile-worker
//! args = --style /srv/style.xml
//! workers = auto
//! artifact_dir = /var/cache/cartoroute/artifacts
//!
//! [database]
//! url = postgres://mapper@localhost/gis
//! road_table = planet_osm_line
//! edge_table = roads
//! vertex_table = roads_vertices_pgr
//!
//! [logging]
//! level = info
//! directory = /var/log/cartoroute
//! ```

mod error;
mod file;
mod keys;

pub use error::ConfigError;
pub use file::{
    config_directory, config_file_path, default_artifact_dir, ConfigFile, DatabaseSettings,
    LoggingSettings, RendererSettings,
};
pub use keys::ConfigKey;
