//! docguard - Documentation Snippet Reference Guard
//!
//! Indexes the code files that documentation cites through snippet
//! references, and checks pull requests against that index so changes that
//! would break published samples are caught before merge.
//!
//! ## Core Features
//!
//! - **Reference Index**: documentation scan into a sorted, deduplicated index
//! - **PR Safety Verdicts**: deleted/renamed referenced files and deleted cells
//! - **Shared Rate-Limit Gate**: concurrent host calls cooperate on one quota
//! - **Review Monitor**: auto-approve safe PRs, comment on the rest
//!
//! ## Quick Start
//!
//! ```ignore
//! use docguard::{ConfigLoader, GitHubClient, PrAnalyzer, RepoRef};
//! use docguard::index::store::read_index;
//!
//! let config = ConfigLoader::load(None)?;
//! let index = read_index(&config.output.refs_path())?;
//! let host = Arc::new(GitHubClient::from_config(&config.api)?);
//! let verdict = PrAnalyzer::new(host)
//!     .analyze(&RepoRef::new("Azure", "azureml-examples"), 42, &index)
//!     .await;
//! ```
//!
//! ## Modules
//!
//! - [`scanner`]: fence scanning, reference extraction, documentation walk
//! - [`index`]: reference index, persistence, ownership files
//! - [`github`]: host API trait, retrying client, rate-limit gate
//! - [`analysis`]: change classification, cell diff, safety decision
//! - [`monitor`]: review cycle over open PRs
//! - [`config`]: layered configuration

pub mod analysis;
pub mod cli;
pub mod config;
pub mod constants;
pub mod github;
pub mod index;
pub mod monitor;
pub mod scanner;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, RepositoryConfig};

// Error Types
pub use types::error::{ErrorCategory, GuardError, Result, ResultExt};

// Domain
pub use types::{Issue, IssueKind, ReferenceRecord, RepoRef, SafetyVerdict};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use analysis::{PrAnalyzer, analyze_pr, find_prs_with_reference_impact};
pub use index::{IndexHandle, ReferenceIndex, build_reference_index};
pub use monitor::{MonitorReport, ReviewMonitor};

// =============================================================================
// Host Re-exports
// =============================================================================

pub use github::{GitHubClient, HostApi, RateLimitGate, RetryPolicy, SharedHost};
