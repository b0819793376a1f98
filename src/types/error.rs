//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for the retry policy of the API client.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Host quota exhausted (wait for reset, then retry)
//! - **Transient**: 5xx server errors (retry with exponential backoff)
//! - **Auth / NotFound / BadRequest**: Request problems (fail fast)
//! - **Network / Decode**: Connectivity or payload issues (fail fast)
//!
//! Scan-phase problems are logged and skipped; PR-analysis problems are turned
//! into verdict issues. Only configuration errors and index I/O terminate a run.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories driving the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait until the quota resets, then retry
    RateLimit,
    /// Server-side failure (HTTP >= 500) - retry with backoff
    Transient,
    /// Authentication or permission failure
    Auth,
    /// Resource does not exist
    NotFound,
    /// Request rejected by the host
    BadRequest,
    /// Connection-level failure
    Network,
    /// Response body could not be decoded
    Decode,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Auth => write!(f, "AUTH"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Network => write!(f, "NETWORK"),
            Self::Decode => write!(f, "DECODE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if the retry policy may repeat a call failing with this category
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Transient)
    }
}

// =============================================================================
// API Error
// =============================================================================

/// Failure reported by the code host, with category and rate-limit context
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Detailed error message
    pub message: String,
    /// Quota reset time (unix seconds) reported with a rate-limit response
    pub reset_at: Option<i64>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}:{}] {}", self.category, status, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            status: None,
            message: message.into(),
            reset_at: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_reset_at(mut self, reset_at: Option<i64>) -> Self {
        self.reset_at = reset_at;
        self
    }

    /// Rate-limit failure with the host-reported reset time
    pub fn rate_limited(reset_at: Option<i64>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::RateLimit, message)
            .with_status(403)
            .with_reset_at(reset_at)
    }

    /// Server-side failure
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Transient, message).with_status(status)
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps host responses onto error categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an unsuccessful HTTP response.
    ///
    /// A 403/429 counts as rate limiting when the quota header reports zero
    /// remaining requests or the body mentions the rate limit; any other 403
    /// is a permission problem.
    pub fn classify_http_status(
        status: u16,
        quota_exhausted: bool,
        reset_at: Option<i64>,
        body: &str,
    ) -> ApiError {
        let mentions_rate_limit = body.to_lowercase().contains("rate limit");
        match status {
            403 | 429 if quota_exhausted || mentions_rate_limit => {
                ApiError::new(ErrorCategory::RateLimit, body)
                    .with_status(status)
                    .with_reset_at(reset_at)
            }
            401 | 403 => ApiError::new(ErrorCategory::Auth, body).with_status(status),
            404 => ApiError::new(ErrorCategory::NotFound, body).with_status(status),
            500.. => ApiError::server(status, body),
            400..=499 => ApiError::new(ErrorCategory::BadRequest, body).with_status(status),
            _ => ApiError::new(ErrorCategory::Unknown, body).with_status(status),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum GuardError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Remote Errors
    // -------------------------------------------------------------------------
    /// Host API failure with category and rate-limit hints
    #[error("API error: {0}")]
    Api(ApiError),

    /// Rate limited and the computed wait did not allow a retry
    #[error("Rate limit exceeded during {operation}: {message}")]
    RateLimitExceeded { operation: String, message: String },

    /// Every attempt allowed by the retry policy failed
    #[error("Max retries ({attempts}) exceeded for {operation}: {last_error}")]
    MaxRetriesExceeded {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    /// Content that cannot be parsed into cell units (e.g. a broken notebook)
    #[error("Malformed content in {path}: {message}")]
    MalformedContent { path: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ApiError> for GuardError {
    fn from(err: ApiError) -> Self {
        GuardError::Api(err)
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl GuardError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a malformed content error
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedContent {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The API error carried by this error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the underlying failure was classified as retryable
    pub fn is_retryable(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_retryable)
    }

    /// Errors that must terminate the run instead of being recorded as issues
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_) | Self::Index(_))
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| GuardError::Index(format!("{}: {}", context.into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
