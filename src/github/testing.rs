//! In-memory `HostApi` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{HostApi, PullQuery, PullRequest, PullState, RateLimitStatus, RawFileChange};
use crate::types::{ApiError, ErrorCategory, GuardError, RepoRef, Result};

#[derive(Default)]
pub struct FakeHost {
    pulls: HashMap<(String, u64), PullRequest>,
    files: HashMap<(String, u64), Vec<RawFileChange>>,
    contents: HashMap<(String, String), String>,
    failing_paths: HashSet<String>,
    failing_file_lists: HashSet<u64>,
    fail_approval: bool,
    actions: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pull(mut self, repo: &RepoRef, pr: PullRequest) -> Self {
        self.pulls.insert((repo.to_string(), pr.number), pr);
        self
    }

    pub fn with_files(mut self, repo: &RepoRef, number: u64, files: Vec<RawFileChange>) -> Self {
        self.files.insert((repo.to_string(), number), files);
        self
    }

    pub fn with_content(mut self, path: &str, git_ref: &str, content: impl Into<String>) -> Self {
        self.contents
            .insert((path.to_string(), git_ref.to_string()), content.into());
        self
    }

    /// Content fetches for this path fail with a server error
    pub fn failing_path(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    pub fn failing_file_list(mut self, number: u64) -> Self {
        self.failing_file_lists.insert(number);
        self
    }

    pub fn failing_approval(mut self) -> Self {
        self.fail_approval = true;
        self
    }

    /// Write calls made so far, e.g. `approve owner/repo#7`
    pub fn actions(&self) -> Vec<String> {
        self.actions
            .lock()
            .map(|a| a.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    fn record(&self, action: String) {
        match self.actions.lock() {
            Ok(mut a) => a.push(action),
            Err(p) => p.into_inner().push(action),
        }
    }
}

fn not_found(what: String) -> GuardError {
    GuardError::from(ApiError::new(ErrorCategory::NotFound, what).with_status(404))
}

#[async_trait]
impl HostApi for FakeHost {
    async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest> {
        self.pulls
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| not_found(format!("{}#{}", repo, number)))
    }

    async fn list_pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<RawFileChange>> {
        if self.failing_file_lists.contains(&number) {
            return Err(ApiError::server(502, "Bad Gateway").into());
        }
        self.files
            .get(&(repo.to_string(), number))
            .cloned()
            .ok_or_else(|| not_found(format!("{}#{} files", repo, number)))
    }

    async fn get_file_content(&self, _repo: &RepoRef, path: &str, git_ref: &str) -> Result<String> {
        if self.failing_paths.contains(path) {
            return Err(ApiError::server(500, "Internal Server Error").into());
        }
        self.contents
            .get(&(path.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("{}@{}", path, git_ref)))
    }

    async fn list_pull_requests(&self, repo: &RepoRef, query: &PullQuery) -> Result<Vec<PullRequest>> {
        let key = repo.to_string();
        let mut pulls: Vec<PullRequest> = self
            .pulls
            .iter()
            .filter(|((r, _), _)| *r == key)
            .map(|(_, pr)| pr.clone())
            .filter(|pr| match query.state {
                PullState::Open => pr.merged_at.is_none(),
                PullState::Closed => pr.merged_at.is_some(),
            })
            .filter(|pr| pr.updated_at >= query.updated_since)
            .collect();
        pulls.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(pulls)
    }

    async fn approve_pull_request(&self, repo: &RepoRef, number: u64, _body: &str) -> Result<()> {
        if self.fail_approval {
            return Err(ApiError::new(ErrorCategory::Auth, "Resource not accessible")
                .with_status(403)
                .into());
        }
        self.record(format!("approve {}#{}", repo, number));
        Ok(())
    }

    async fn comment_on_pull_request(&self, repo: &RepoRef, number: u64, _body: &str) -> Result<()> {
        self.record(format!("comment {}#{}", repo, number));
        Ok(())
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        Ok(RateLimitStatus {
            limit: 5000,
            remaining: 5000,
            reset: Utc::now().timestamp() + 3600,
        })
    }
}

/// Open, non-draft PR updated `age_days` ago
pub fn pull(number: u64, age_days: i64) -> PullRequest {
    let updated_at: DateTime<Utc> = Utc::now() - Duration::days(age_days);
    PullRequest {
        number,
        title: format!("PR {}", number),
        html_url: format!("https://github.com/o/r/pull/{}", number),
        author: Some("contributor".into()),
        draft: false,
        base_sha: "base".into(),
        head_sha: "head".into(),
        updated_at,
        merged_at: None,
        requested_teams: Vec::new(),
    }
}

pub fn change(filename: &str, status: &str) -> RawFileChange {
    RawFileChange {
        filename: filename.into(),
        status: status.into(),
        blob_url: Some(format!("https://github.com/o/r/blob/head/{}", filename)),
        previous_filename: None,
    }
}
