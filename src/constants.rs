//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// OpenFDA API constants
pub mod openfda {
    /// Public API root; endpoint paths are joined onto it
    pub const DEFAULT_API_BASE: &str = "https://api.fda.gov/";

    /// Largest `limit` the API accepts per request
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Largest `skip` the API accepts before requiring `search_after`
    pub const MAX_SKIP: u32 = 25_000;

    /// Page size used when none is given
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Page size used by the pagination loop
    pub const PAGINATION_PAGE_SIZE: u32 = 100;

    /// Default record ceiling for `fetch_all`
    pub const DEFAULT_MAX_RECORDS: usize = 1000;

    /// Client-side request budget (requests per minute, 0 disables)
    pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;

    /// Error code OpenFDA returns with HTTP 404 when a search matches nothing
    pub const NOT_FOUND_CODE: &str = "NOT_FOUND";
}

/// Retry constants for the OpenFDA adapter
pub mod retry {
    /// Total attempts per request, including the first one
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

    /// Initial backoff delay (milliseconds)
    pub const MIN_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// Result cache constants
pub mod cache {
    /// Cache entry time-to-live (seconds)
    pub const DEFAULT_TTL_SECS: u64 = 3600;
}

/// Concurrent fetch constants
pub mod fetch {
    /// Worker pool size for batched requests
    pub const DEFAULT_POOL_SIZE: usize = 5;
}

/// Gemini / AI summarization constants
pub mod ai {
    /// Generative Language API root
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Model used for trend commentary
    pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

    /// Upper bound on one summarization call (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.4;

    /// Maximum tokens to generate
    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

    /// Rows of a tabular summary included in a prompt
    pub const DEFAULT_MAX_SUMMARY_ROWS: usize = 10;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
}
