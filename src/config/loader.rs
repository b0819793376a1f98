//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/docguard/config.toml)
//! 3. Project config (./docguard.toml, or an explicit path)
//! 4. Environment variables (DOCGUARD_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{GuardError, Result};

const ENV_PREFIX: &str = "DOCGUARD_";
const PROJECT_CONFIG_FILE: &str = "docguard.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let project_path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::project_config_path);

        if explicit.is_some() && !project_path.exists() {
            return Err(GuardError::Config(format!(
                "Config file not found: {}",
                project_path.display()
            )));
        }

        let config: Config = Self::figment(Self::global_config_path().as_deref(), &project_path)
            .extract()
            .map_err(|e| GuardError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (no global file, no env)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| GuardError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn figment(global: Option<&Path>, project: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // DOCGUARD_API__MAX_RETRIES -> api.max_retries
        figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/docguard/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("docguard"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| GuardError::Config(e.to_string()))
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a starter project config. Existing files are kept unless `force`.
    pub fn init_project(path: Option<&Path>, force: bool) -> Result<PathBuf> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::project_config_path);

        if config_path.exists() && !force {
            info!("Project config exists: {}", config_path.display());
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, Self::default_project_config())?;
        info!("Created project config: {}", config_path.display());
        Ok(config_path)
    }

    /// Generate default project config content (TOML)
    fn default_project_config() -> String {
        r#"# docguard project configuration
# Environment variables override these values: DOCGUARD_API__MAX_RETRIES=5

version = "1.0"

[[repositories]]
key = "azureml-examples"
owner = "Azure"
repo = "azureml-examples"
team = "@Azure/ai-platform-docs"
short_name = "ml"
search_paths = ["articles/machine-learning", "articles/ai-foundry"]

[docs]
repo = "MicrosoftDocs/azure-ai-docs"
branch = "main"
root_prefix = "articles/"
default_category = "machine-learning"
recursive_markers = ["ai-foundry"]
exclude_directories = ["media"]

[[docs.categories]]
contains = "ai-foundry"
category = "ai-foundry"

[output]
directory = "outputs"
refs_file = "refs-found.csv"

[api]
token_env = "GH_ACCESS_TOKEN"
max_retries = 3
backoff_factor = 2.0
rate_limit_buffer_secs = 10
request_timeout_secs = 30
max_concurrency = 8

[approval]
auto_approve_enabled = true
dry_run = false
review_window_days = 14
"#
        .to_string()
    }
}
