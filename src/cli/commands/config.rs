//! Config Command
//!
//! Manage docguard configuration.
//!
//! Usage:
//!   docguard config show [-f json]
//!   docguard config path
//!   docguard config init [--force]

use std::path::Path;

use crate::cli::OutputFormat;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&config)?,
        other => ConfigLoader::render(&config, other == OutputFormat::Json)?,
    };
    println!("{}", rendered);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a starter project configuration
pub fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = ConfigLoader::init_project(config_path, force)?;
    let out = Output::new();
    out.success("Initialized project configuration");
    out.field("Config", path.display());
    Ok(())
}
