//! CLI Common Utilities
//!
//! Shared context and output formatting for command handlers.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{Config, ConfigLoader, RepositoryConfig};
use crate::github::{GitHubClient, SharedHost};
use crate::index::{ReferenceIndex, store};
use crate::types::{GuardError, Result};

/// Command execution context
///
/// Loaded once per invocation. The host client is created on demand since
/// `config` and `index` commands never talk to the host.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Ok(Self {
            config: ConfigLoader::load(config_path)?,
        })
    }

    /// Host client; a missing access token is a configuration error
    pub fn host(&self) -> Result<SharedHost> {
        Ok(Arc::new(GitHubClient::from_config(&self.config.api)?))
    }

    /// The persisted reference index; absent on first run is a configuration error
    pub fn load_index(&self) -> Result<ReferenceIndex> {
        store::read_index(&self.config.output.refs_path())
    }

    pub fn require_repository(&self, key: &str) -> Result<&RepositoryConfig> {
        self.config.repository(key).ok_or_else(|| {
            let known: Vec<&str> = self
                .config
                .repositories
                .iter()
                .map(|r| r.key.as_str())
                .collect();
            GuardError::Config(format!(
                "Unknown repository '{}'. Configured: {}",
                key,
                known.join(", ")
            ))
        })
    }

    /// Selected repositories: one by key, or all configured
    pub fn select_repositories(&self, key: Option<&str>) -> Result<Vec<RepositoryConfig>> {
        match key {
            Some(key) => Ok(vec![self.require_repository(key)?.clone()]),
            None => Ok(self.config.repositories.clone()),
        }
    }
}

/// Machine-readable or human output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!(
                "Invalid format '{}'. Valid values: text, json, yaml",
                s
            )),
        }
    }
}

impl OutputFormat {
    /// Serialize for json/yaml; `None` for text, which each command renders itself
    pub fn render<T: Serialize>(&self, value: &T) -> Result<Option<String>> {
        match self {
            Self::Text => Ok(None),
            Self::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
            Self::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_render_text_is_none() {
        assert!(OutputFormat::Text.render(&vec![1, 2]).unwrap().is_none());
        let json = OutputFormat::Json.render(&vec![1, 2]).unwrap().unwrap();
        assert!(json.contains('1'));
    }

    #[test]
    fn test_select_unknown_repository() {
        let ctx = CommandContext {
            config: Config::default(),
        };
        assert!(matches!(
            ctx.select_repositories(Some("nope")),
            Err(GuardError::Config(_))
        ));
        assert_eq!(
            ctx.select_repositories(None).unwrap().len(),
            ctx.config.repositories.len()
        );
    }
}
