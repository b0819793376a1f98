//! Configuration Types
//!
//! All configuration structures with sensible defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{api, output, retry, review, scan};
use crate::types::{GuardError, RepoRef, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Code repositories whose files documentation cites
    pub repositories: Vec<RepositoryConfig>,

    /// Documentation scan settings
    pub docs: DocsConfig,

    /// Output file locations
    pub output: OutputConfig,

    /// Code host API settings
    pub api: ApiConfig,

    /// PR review and approval settings
    pub approval: ApprovalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            repositories: Vec::new(),
            docs: DocsConfig::default(),
            output: OutputConfig::default(),
            api: ApiConfig::default(),
            approval: ApprovalConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `GuardError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.api.request_timeout_secs == 0 {
            return Err(GuardError::Config(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.api.max_concurrency == 0 {
            return Err(GuardError::Config(
                "api.max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.api.backoff_factor <= 0.0 {
            return Err(GuardError::Config(format!(
                "api.backoff_factor must be positive, got {}",
                self.api.backoff_factor
            )));
        }

        if self.api.per_page == 0 || self.api.per_page > api::PER_PAGE {
            return Err(GuardError::Config(format!(
                "api.per_page must be between 1 and {}",
                api::PER_PAGE
            )));
        }

        for repo in &self.repositories {
            if repo.repo.trim().is_empty() || repo.owner.trim().is_empty() {
                return Err(GuardError::Config(format!(
                    "Repository '{}' needs both owner and repo",
                    repo.key
                )));
            }
        }

        Ok(())
    }

    /// Find a repository by key, repo token or legacy short name
    pub fn repository(&self, key: &str) -> Option<&RepositoryConfig> {
        let key = key.to_lowercase();
        self.repositories.iter().find(|r| {
            r.key.to_lowercase() == key
                || r.repo.to_lowercase() == key
                || r.short_name.as_deref().map(str::to_lowercase).as_deref() == Some(&key)
        })
    }

    /// Union of all configured search paths, sorted and deduplicated
    pub fn search_roots(&self) -> Vec<SearchRoot> {
        let mut paths: Vec<&str> = self
            .repositories
            .iter()
            .flat_map(|r| r.search_paths.iter().map(String::as_str))
            .collect();
        paths.sort_unstable();
        paths.dedup();

        paths
            .into_iter()
            .map(|path| SearchRoot {
                path: path.to_string(),
                recursive: self
                    .docs
                    .recursive_markers
                    .iter()
                    .any(|marker| path.contains(marker.as_str())),
            })
            .collect()
    }
}

// =============================================================================
// Repositories
// =============================================================================

/// A code repository whose files are cited from documentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Lookup key used on the command line
    pub key: String,
    /// Owner (organization) on the code host
    pub owner: String,
    /// Repository name; doubles as the reference token (`~/<repo>-main/...`)
    pub repo: String,
    /// Team that owns referenced files (`@org/team`)
    pub team: String,
    /// Legacy short alias (e.g. `ml`)
    #[serde(default)]
    pub short_name: Option<String>,
    /// Documentation directories that cite this repository
    #[serde(default)]
    pub search_paths: Vec<String>,
}

impl RepositoryConfig {
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(&self.owner, &self.repo)
    }

    /// Branch token recorded references must carry (`<repo>-main`)
    pub fn main_branch_token(&self) -> String {
        format!("{}{}", self.repo, scan::MAIN_BRANCH_SUFFIX)
    }

    /// Team slug variants a PR's requested teams are matched against
    pub fn team_slugs(&self, aliases: &[String]) -> Vec<String> {
        let team = self.team.trim_start_matches('@').to_lowercase();
        let mut slugs = vec![team.clone(), team.replace('/', "-")];
        if let Some((_, last)) = team.rsplit_once('/') {
            slugs.push(last.to_string());
        }
        slugs.extend(aliases.iter().map(|a| a.to_lowercase()));
        slugs.sort();
        slugs.dedup();
        slugs
    }
}

/// Documentation directory to scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRoot {
    /// Path relative to the docs checkout
    pub path: String,
    /// Descend into subdirectories
    pub recursive: bool,
}

// =============================================================================
// Documentation Scan
// =============================================================================

/// Maps a path substring to a documentation area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCategory {
    pub contains: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Documentation repository (`owner/name`), informational
    pub repo: String,
    /// Branch of the documentation checkout
    pub branch: String,
    /// Prefix stripped from document paths to form `from_file_dir`
    pub root_prefix: String,
    /// Substring → category rules for the coarse fallback
    pub categories: Vec<PathCategory>,
    /// Category when no rule matches
    pub default_category: String,
    /// Search paths containing one of these are scanned recursively
    pub recursive_markers: Vec<String>,
    /// Directories skipped during the scan
    pub exclude_directories: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            repo: "MicrosoftDocs/azure-ai-docs".to_string(),
            branch: "main".to_string(),
            root_prefix: scan::ROOT_PREFIX.to_string(),
            categories: vec![PathCategory {
                contains: "ai-foundry".to_string(),
                category: "ai-foundry".to_string(),
            }],
            default_category: scan::DEFAULT_CATEGORY.to_string(),
            recursive_markers: vec!["ai-foundry".to_string()],
            exclude_directories: vec!["media".to_string()],
        }
    }
}

impl DocsConfig {
    /// Coarse documentation area for a path (substring heuristic)
    pub fn category_for(&self, path: &str) -> &str {
        self.categories
            .iter()
            .find(|c| path.contains(c.contains.as_str()))
            .map(|c| c.category.as_str())
            .unwrap_or(&self.default_category)
    }
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub refs_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: output::DIRECTORY.to_string(),
            refs_file: output::REFS_FILE.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn refs_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.directory).join(&self.refs_file)
    }
}

// =============================================================================
// API
// =============================================================================

/// Code host API configuration.
///
/// The token itself is never stored here; only the name of the environment
/// variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub token_env: String,
    pub max_retries: u32,
    pub backoff_factor: f32,
    pub max_backoff_secs: u64,
    pub rate_limit_buffer_secs: u64,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
    pub per_page: usize,
    pub max_pages: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            token_env: api::DEFAULT_TOKEN_ENV.to_string(),
            max_retries: retry::DEFAULT_MAX_RETRIES,
            backoff_factor: retry::BACKOFF_FACTOR,
            max_backoff_secs: retry::MAX_BACKOFF_SECS,
            rate_limit_buffer_secs: retry::RATE_LIMIT_BUFFER_SECS,
            request_timeout_secs: api::REQUEST_TIMEOUT_SECS,
            max_concurrency: api::MAX_CONCURRENCY,
            per_page: api::PER_PAGE,
            max_pages: api::MAX_PAGES,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Approval
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Approve PRs whose verdict is safe
    pub auto_approve_enabled: bool,
    /// Log approvals and comments instead of sending them
    pub dry_run: bool,
    /// Extra team slugs treated as a review request for every repository
    pub team_slug_aliases: Vec<String>,
    /// Look-back window for open PRs (days)
    pub review_window_days: i64,
    /// Exclusive upper bound for the merged-PR impact window (days)
    pub max_merge_window_days: i64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            auto_approve_enabled: true,
            dry_run: false,
            team_slug_aliases: vec![review::DEFAULT_TEAM_ALIAS.to_string()],
            review_window_days: review::REVIEW_WINDOW_DAYS,
            max_merge_window_days: review::MAX_MERGE_WINDOW_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(key: &str, repo: &str, paths: &[&str]) -> RepositoryConfig {
        RepositoryConfig {
            key: key.to_string(),
            owner: "Azure".to_string(),
            repo: repo.to_string(),
            team: "@Azure/ai-platform-docs".to_string(),
            short_name: Some("ml".to_string()),
            search_paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.api.request_timeout_secs = 0;
        assert!(matches!(config.validate(), Err(GuardError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_repo_token() {
        let mut config = Config::default();
        config.repositories.push(repo("x", " ", &[]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_repository_lookup_by_key_token_or_alias() {
        let mut config = Config::default();
        config
            .repositories
            .push(repo("azureml-examples", "azureml-examples", &[]));
        assert!(config.repository("azureml-examples").is_some());
        assert!(config.repository("ML").is_some());
        assert!(config.repository("unknown").is_none());
    }

    #[test]
    fn test_search_roots_union_and_recursion() {
        let mut config = Config::default();
        config.repositories.push(repo(
            "a",
            "a",
            &["articles/machine-learning", "articles/ai-foundry"],
        ));
        config
            .repositories
            .push(repo("b", "b", &["articles/ai-foundry"]));

        let roots = config.search_roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].path, "articles/ai-foundry");
        assert!(roots[0].recursive);
        assert!(!roots[1].recursive);
    }

    #[test]
    fn test_team_slugs() {
        let r = repo("a", "a", &[]);
        let slugs = r.team_slugs(&["extra".to_string()]);
        assert!(slugs.contains(&"azure/ai-platform-docs".to_string()));
        assert!(slugs.contains(&"azure-ai-platform-docs".to_string()));
        assert!(slugs.contains(&"ai-platform-docs".to_string()));
        assert!(slugs.contains(&"extra".to_string()));
    }

    #[test]
    fn test_category_for() {
        let docs = DocsConfig::default();
        assert_eq!(docs.category_for("articles/ai-foundry/x.md"), "ai-foundry");
        assert_eq!(docs.category_for("other/x.md"), "machine-learning");
    }

    #[test]
    fn test_main_branch_token() {
        assert_eq!(
            repo("a", "azureml-examples", &[]).main_branch_token(),
            "azureml-examples-main"
        );
    }
}
