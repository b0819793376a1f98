//! Code Host Access
//!
//! Defines the `HostApi` trait used by analysis and the review monitor, the
//! host-side records it returns, and the REST client implementing it.
//!
//! ## Modules
//!
//! - `client`: reqwest-based REST client; every call goes through the retry policy
//! - `rate_limit`: shared quota gate
//! - `retry`: retry/backoff policy
//! - `timeout`: per-call timeout
//! - `testing`: in-memory host for unit tests

mod client;
pub mod rate_limit;
pub mod retry;
pub mod timeout;

#[cfg(test)]
pub(crate) mod testing;

pub use client::GitHubClient;
pub use rate_limit::{GateStats, RateLimitGate, compute_rate_limit_wait};
pub use retry::RetryPolicy;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{RepoRef, Result};

// =============================================================================
// Host Records
// =============================================================================

/// Pull request summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub author: Option<String>,
    pub draft: bool,
    /// Commit the PR is based on (target branch tip)
    pub base_sha: String,
    pub head_sha: String,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Slugs of teams whose review was requested
    pub requested_teams: Vec<String>,
}

/// One entry of a PR's file list, as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFileChange {
    pub filename: String,
    pub status: String,
    pub blob_url: Option<String>,
    pub previous_filename: Option<String>,
}

/// Core API quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds
    pub reset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Open,
    Closed,
}

impl PullState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Filter for listing pull requests
#[derive(Debug, Clone)]
pub struct PullQuery {
    pub state: PullState,
    /// Stop listing once PRs were last updated before this instant
    pub updated_since: DateTime<Utc>,
}

// =============================================================================
// Host API Trait
// =============================================================================

/// Operations on the code host used by analysis and the review monitor.
///
/// Implementations apply the retry policy and rate-limit gate to every call.
#[async_trait]
pub trait HostApi: Send + Sync {
    async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest>;

    /// All file entries of a PR, across pages
    async fn list_pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<RawFileChange>>;

    /// Raw file content at a commit
    async fn get_file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<String>;

    /// PRs ordered by last update, newest first, down to `query.updated_since`
    async fn list_pull_requests(&self, repo: &RepoRef, query: &PullQuery) -> Result<Vec<PullRequest>>;

    async fn approve_pull_request(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()>;

    async fn comment_on_pull_request(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()>;

    async fn rate_limit_status(&self) -> Result<RateLimitStatus>;
}

pub type SharedHost = Arc<dyn HostApi>;
