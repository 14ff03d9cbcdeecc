//! Init command - write the configuration file.

use std::path::Path;

use cartoroute::config::ConfigFile;

use crate::error::CliError;

/// Write the configuration file at `path`, keeping any existing settings.
pub fn run(path: &Path) -> Result<(), CliError> {
    let existed = path.exists();
    let config = ConfigFile::load_from(path)?;
    config.save_to(path)?;

    if existed {
        println!("Updated configuration file: {}", path.display());
    } else {
        println!("Created configuration file: {}", path.display());
    }
    println!();
    println!("Set database.url to plan routes against PostGIS,");
    println!("and renderer.program to use a real tile renderer.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
