//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Code host API constants
pub mod api {
    /// Default REST API base URL
    pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

    /// Environment variable holding the access token
    pub const DEFAULT_TOKEN_ENV: &str = "GH_ACCESS_TOKEN";

    /// API version header value
    pub const API_VERSION: &str = "2022-11-28";

    /// User agent sent with every request
    pub const USER_AGENT: &str = "docguard";

    /// Page size for paginated listings (host maximum)
    pub const PER_PAGE: usize = 100;

    /// Maximum pages fetched for a single listing (host caps PR files at 3000)
    pub const MAX_PAGES: usize = 30;

    /// Per-request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Maximum concurrent remote analyses
    pub const MAX_CONCURRENCY: usize = 8;
}

/// Retry policy constants
pub mod retry {
    /// Default maximum attempts per remote call
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Backoff multiplier for server errors (wait = factor ** attempt)
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Cap on a single server-error backoff (seconds)
    pub const MAX_BACKOFF_SECS: u64 = 60;

    /// Added to the computed rate-limit reset wait (seconds)
    pub const RATE_LIMIT_BUFFER_SECS: u64 = 10;
}

/// Documentation scan constants
pub mod scan {
    /// Opening/closing fence for code blocks
    pub const FENCE: &str = "```";

    /// Documentation file extension
    pub const DOC_EXTENSION: &str = "md";

    /// Path prefix stripped when deriving `from_file_dir`
    pub const ROOT_PREFIX: &str = "articles/";

    /// Category used when no configured path substring matches
    pub const DEFAULT_CATEGORY: &str = "machine-learning";

    /// Suffix appended to a repository token to form its main branch token
    pub const MAIN_BRANCH_SUFFIX: &str = "-main";
}

/// Output file constants
pub mod output {
    /// Default output directory
    pub const DIRECTORY: &str = "outputs";

    /// Persisted reference index file name
    pub const REFS_FILE: &str = "refs-found.csv";

    /// Ownership file prefix (`CODEOWNERS-<token>.txt`)
    pub const CODEOWNERS_PREFIX: &str = "CODEOWNERS-";

    /// Code count file prefix (`code-counts-<category>.csv`)
    pub const CODE_COUNTS_PREFIX: &str = "code-counts-";
}

/// Review workflow constants
pub mod review {
    /// Look-back window for open PRs needing review (days)
    pub const REVIEW_WINDOW_DAYS: i64 = 14;

    /// Default look-back window for merged PR impact (days)
    pub const MERGE_WINDOW_DAYS: i64 = 8;

    /// Exclusive upper bound on the merged PR look-back window (days)
    pub const MAX_MERGE_WINDOW_DAYS: i64 = 100;

    /// Known team slug that also counts as a team review request
    pub const DEFAULT_TEAM_ALIAS: &str = "ai-platform-docs";
}
