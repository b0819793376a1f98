//! GitHub REST Client
//!
//! Implements [`HostApi`] over the REST v3 API. Every request goes through one
//! helper that applies the retry policy, the shared rate-limit gate and the
//! per-call timeout, and feeds quota headers back into the gate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};
use url::Url;

use super::rate_limit::RateLimitGate;
use super::retry::RetryPolicy;
use super::{HostApi, PullQuery, PullRequest, RateLimitStatus, RawFileChange};
use crate::config::ApiConfig;
use crate::constants::api;
use crate::types::{ApiError, ErrorCategory, ErrorClassifier, GuardError, RepoRef, Result};

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// REST client with secure token handling
pub struct GitHubClient {
    /// Token stored securely - never exposed in logs or debug output
    token: SecretString,
    base_url: Url,
    http: reqwest::Client,
    policy: RetryPolicy,
    gate: Arc<RateLimitGate>,
    per_page: usize,
    max_pages: usize,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .field("policy", &self.policy)
            .field("per_page", &self.per_page)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

impl GitHubClient {
    /// Build a client, reading the token from the environment variable named
    /// by `api.token_env`. A missing token is a configuration error.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                GuardError::Config(format!(
                    "GitHub token not found. Set the {} environment variable",
                    config.token_env
                ))
            })?;

        Self::new(config, SecretString::from(token))
    }

    pub fn new(config: &ApiConfig, token: SecretString) -> Result<Self> {
        let base_url = Self::validate_base_url(&config.base_url)?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(api::USER_AGENT)
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token,
            base_url,
            http,
            policy: RetryPolicy::from_config(config),
            gate: Arc::new(RateLimitGate::new(Duration::from_secs(
                config.rate_limit_buffer_secs,
            ))),
            per_page: config.per_page,
            max_pages: config.max_pages,
        })
    }

    /// Share an existing gate (e.g. between clients for different tokens)
    pub fn with_gate(mut self, gate: Arc<RateLimitGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &Arc<RateLimitGate> {
        &self.gate
    }

    fn validate_base_url(base_url: &str) -> Result<Url> {
        let url = Url::parse(base_url).map_err(|e| {
            GuardError::Config(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(GuardError::Config(format!(
                "API base URL must use http or https scheme, got: {}",
                url.scheme()
            )));
        }

        if url.cannot_be_a_base() {
            return Err(GuardError::Config(format!(
                "API base URL cannot be used as a base: {}",
                base_url
            )));
        }

        Ok(url)
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GuardError::Config(format!("Invalid API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn repo_endpoint(&self, repo: &RepoRef, rest: &[&str]) -> Result<Url> {
        let segments = ["repos", repo.owner.as_str(), repo.name.as_str()];
        self.endpoint(segments.into_iter().chain(rest.iter().copied()))
    }

    // =========================================================================
    // Request execution
    // =========================================================================

    /// Send one request under the retry policy and return the body text.
    async fn execute(
        &self,
        operation: &str,
        method: Method,
        url: &Url,
        query: &[(&str, String)],
        body: Option<&Value>,
        accept: &str,
    ) -> Result<String> {
        self.policy
            .run(&self.gate, operation, || {
                let mut request = self
                    .http
                    .request(method.clone(), url.clone())
                    .bearer_auth(self.token.expose_secret())
                    .header(ACCEPT, accept)
                    .header("X-GitHub-Api-Version", api::API_VERSION)
                    .query(query);
                if let Some(body) = body {
                    request = request.json(body);
                }
                self.attempt(operation, request)
            })
            .await
    }

    /// One attempt: send, record quota headers, classify failures
    async fn attempt(&self, operation: &str, request: RequestBuilder) -> Result<String> {
        let response = request.send().await.map_err(|e| {
            ApiError::new(
                ErrorCategory::Network,
                format!("{} request failed: {}", operation, e),
            )
        })?;

        let status = response.status();
        let (remaining, reset_at) = quota_headers(response.headers());
        self.gate
            .observe(remaining, reset_at, Utc::now().timestamp())
            .await;

        let text = response.text().await.map_err(|e| {
            ApiError::new(
                ErrorCategory::Network,
                format!("{} body read failed: {}", operation, e),
            )
        })?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ErrorClassifier::classify_http_status(
                status.as_u16(),
                remaining == Some(0),
                reset_at,
                &text,
            )
            .into())
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        let text = self
            .execute(operation, Method::GET, url, query, None, ACCEPT_JSON)
            .await?;
        decode(operation, &text)
    }

    async fn post(&self, operation: &str, url: &Url, body: &Value) -> Result<()> {
        self.execute(operation, Method::POST, url, &[], Some(body), ACCEPT_JSON)
            .await
            .map(|_| ())
    }

    fn page_query(&self, page: usize) -> Vec<(&'static str, String)> {
        vec![
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ]
    }
}

#[async_trait]
impl HostApi for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<PullRequest> {
        let number_str = number.to_string();
        let url = self.repo_endpoint(repo, &["pulls", number_str.as_str()])?;
        let wire: WirePull = self.get_json("get pull request", &url, &[]).await?;
        Ok(wire.into())
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn list_pr_files(&self, repo: &RepoRef, number: u64) -> Result<Vec<RawFileChange>> {
        let number_str = number.to_string();
        let url = self.repo_endpoint(repo, &["pulls", number_str.as_str(), "files"])?;

        let mut files = Vec::new();
        for page in 1..=self.max_pages {
            let batch: Vec<WireFile> = self
                .get_json("list pull request files", &url, &self.page_query(page))
                .await?;
            let count = batch.len();
            files.extend(batch.into_iter().map(RawFileChange::from));
            if count < self.per_page {
                break;
            }
        }

        debug!(count = files.len(), "Fetched PR file list");
        Ok(files)
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn get_file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<String> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let url = self.repo_endpoint(repo, &segments)?;

        self.execute(
            "get file content",
            Method::GET,
            &url,
            &[("ref", git_ref.to_string())],
            None,
            ACCEPT_RAW,
        )
        .await
    }

    #[instrument(skip(self, query), fields(repo = %repo, state = query.state.as_str()))]
    async fn list_pull_requests(&self, repo: &RepoRef, query: &PullQuery) -> Result<Vec<PullRequest>> {
        let url = self.repo_endpoint(repo, &["pulls"])?;

        let mut pulls = Vec::new();
        for page in 1..=self.max_pages {
            let mut params = self.page_query(page);
            params.push(("state", query.state.as_str().to_string()));
            params.push(("sort", "updated".to_string()));
            params.push(("direction", "desc".to_string()));

            let batch: Vec<WirePull> = self.get_json("list pull requests", &url, &params).await?;
            let count = batch.len();
            let mut reached_cutoff = false;

            for wire in batch {
                if wire.updated_at < query.updated_since {
                    reached_cutoff = true;
                    break;
                }
                pulls.push(PullRequest::from(wire));
            }

            if reached_cutoff || count < self.per_page {
                break;
            }
        }

        debug!(count = pulls.len(), "Listed pull requests");
        Ok(pulls)
    }

    #[instrument(skip(self, body), fields(repo = %repo))]
    async fn approve_pull_request(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        let number_str = number.to_string();
        let url = self.repo_endpoint(repo, &["pulls", number_str.as_str(), "reviews"])?;
        self.post("approve pull request", &url, &json!({ "event": "APPROVE", "body": body }))
            .await?;
        info!(number, "Approved pull request");
        Ok(())
    }

    #[instrument(skip(self, body), fields(repo = %repo))]
    async fn comment_on_pull_request(&self, repo: &RepoRef, number: u64, body: &str) -> Result<()> {
        let number_str = number.to_string();
        let url = self.repo_endpoint(repo, &["issues", number_str.as_str(), "comments"])?;
        self.post("comment on pull request", &url, &json!({ "body": body }))
            .await?;
        info!(number, "Commented on pull request");
        Ok(())
    }

    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let url = self.endpoint(["rate_limit"])?;
        let wire: WireRateLimit = self.get_json("get rate limit", &url, &[]).await?;
        Ok(RateLimitStatus {
            limit: wire.resources.core.limit,
            remaining: wire.resources.core.remaining,
            reset: wire.resources.core.reset,
        })
    }
}

fn decode<T: DeserializeOwned>(operation: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| {
        ApiError::new(
            ErrorCategory::Decode,
            format!("Failed to parse {} response: {}", operation, e),
        )
        .into()
    })
}

fn quota_headers(headers: &HeaderMap) -> (Option<u64>, Option<i64>) {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .map(str::to_string)
    };
    (
        value("x-ratelimit-remaining").and_then(|v| v.parse().ok()),
        value("x-ratelimit-reset").and_then(|v| v.parse().ok()),
    )
}

// Wire types

#[derive(Debug, Deserialize)]
struct WirePull {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    user: Option<WireUser>,
    #[serde(default)]
    draft: bool,
    base: WireCommitRef,
    head: WireCommitRef,
    updated_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    requested_teams: Vec<WireTeam>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct WireCommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WireTeam {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    filename: String,
    status: String,
    blob_url: Option<String>,
    previous_filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRateLimit {
    resources: WireResources,
}

#[derive(Debug, Deserialize)]
struct WireResources {
    core: WireQuota,
}

#[derive(Debug, Deserialize)]
struct WireQuota {
    limit: u64,
    remaining: u64,
    reset: i64,
}

impl From<WirePull> for PullRequest {
    fn from(wire: WirePull) -> Self {
        Self {
            number: wire.number,
            title: wire.title,
            html_url: wire.html_url,
            author: wire.user.map(|u| u.login),
            draft: wire.draft,
            base_sha: wire.base.sha,
            head_sha: wire.head.sha,
            updated_at: wire.updated_at,
            merged_at: wire.merged_at,
            requested_teams: wire.requested_teams.into_iter().map(|t| t.slug).collect(),
        }
    }
}

impl From<WireFile> for RawFileChange {
    fn from(wire: WireFile) -> Self {
        Self {
            filename: wire.filename,
            status: wire.status,
            blob_url: wire.blob_url,
            previous_filename: wire.previous_filename,
        }
    }
}
