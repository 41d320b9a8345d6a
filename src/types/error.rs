//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for retry decisions.
//!
//! ## Error Categories
//!
//! - **Network**: Connectivity issues and 5xx responses (retry with backoff)
//! - **RateLimit**: HTTP 429 (wait and retry)
//! - **Client**: Malformed query or other 4xx (fail fast)
//! - **Auth**: Missing or rejected API key (fatal for the session)
//! - **Decode**: Response body was not the expected JSON (fail fast)
//! - **AiService**: Summarization call failed or timed out
//!
//! Adapters never raise: per-request failures travel as [`ApiError`] values
//! inside their result types. [`LensError`] is reserved for construction,
//! configuration, and the CLI boundary.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry routing and user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Transport failure or server-side error - retry with backoff
    Network,
    /// Rate limited - wait then retry
    RateLimit,
    /// Invalid request - don't retry, fix request
    Client,
    /// Missing or rejected credentials - don't retry
    Auth,
    /// Response body could not be decoded - don't retry
    Decode,
    /// Language-model call failed or timed out
    AiService,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "NETWORK"),
            Self::RateLimit => write!(f, "RATE_LIMITED"),
            Self::Client => write!(f, "CLIENT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Decode => write!(f, "DECODE"),
            Self::AiService => write!(f, "AI_SERVICE"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable against the same endpoint
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit)
    }
}

// =============================================================================
// API Error
// =============================================================================

/// Tagged error value carried by fetch results and summary responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiError {
    /// Error category for routing decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// HTTP status, when the failure came from a response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Server-suggested wait before retrying
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{} {}] {}", self.category, status, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            status: None,
            retry_after: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::RateLimit, message)
    }

    pub fn client(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Client, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Decode, message)
    }

    pub fn ai_service(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::AiService, message)
    }

    /// Attach the HTTP status that produced this error
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport failures and HTTP statuses onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code
    pub fn classify_status(status: u16, message: impl Into<String>) -> ApiError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400..=499 => ErrorCategory::Client,
            500..=599 => ErrorCategory::Network,
            _ => ErrorCategory::Decode,
        };
        ApiError::new(category, message).with_status(status)
    }

    /// Classify a transport-level failure from the HTTP client
    pub fn classify_transport(err: &reqwest::Error) -> ApiError {
        if err.is_builder() {
            return ApiError::client(format!("Invalid request: {}", err));
        }
        if err.is_decode() {
            return ApiError::decode(format!("Failed to decode response: {}", err));
        }
        if let Some(status) = err.status() {
            return Self::classify_status(status.as_u16(), err.to_string());
        }
        // Connect, timeout, body and redirect failures are all worth another try
        ApiError::network(err.to_string())
    }

    /// Parse a `Retry-After` header value given in seconds
    pub fn parse_retry_after(value: &str) -> Option<Duration> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .map(|secs| Duration::from_secs(secs.min(300)))
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum LensError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    /// Missing or unusable API key, raised before any network call
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Tagged remote-service failure
    #[error("API error: {0}")]
    Api(ApiError),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl From<ApiError> for LensError {
    fn from(err: ApiError) -> Self {
        LensError::Api(err)
    }
}

pub type Result<T> = std::result::Result<T, LensError>;

impl LensError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Category of this error, when it maps onto the remote-call taxonomy
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Auth(_) => Some(ErrorCategory::Auth),
            Self::Api(e) => Some(e.category),
            Self::Timeout { .. } => Some(ErrorCategory::Network),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
