//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/fdalens/) and project (.fdalens/) level configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::{LensError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// OpenFDA adapter settings
    pub openfda: OpenFdaConfig,

    /// Retry policy for OpenFDA requests
    pub retry: RetryConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Concurrent fetch settings
    pub fetch: FetchConfig,

    /// Gemini summarization settings
    pub gemini: GeminiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            openfda: OpenFdaConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `LensError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.openfda.timeout_secs == 0 {
            return Err(LensError::Config(
                "openfda.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(LensError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.factor < 1.0 {
            return Err(LensError::Config(format!(
                "retry.factor must be at least 1.0, got {}",
                self.retry.factor
            )));
        }

        if self.cache.ttl_secs == 0 {
            return Err(LensError::Config(
                "cache.ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.fetch.pool_size == 0 {
            return Err(LensError::Config(
                "fetch.pool_size must be greater than 0".to_string(),
            ));
        }

        let max_page = constants::openfda::MAX_PAGE_SIZE;
        if self.fetch.page_size == 0 || self.fetch.page_size > max_page {
            return Err(LensError::Config(format!(
                "fetch.page_size must be between 1 and {}, got {}",
                max_page, self.fetch.page_size
            )));
        }

        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(LensError::Config(format!(
                "gemini.temperature must be between 0.0 and 2.0, got {}",
                self.gemini.temperature
            )));
        }

        if self.gemini.timeout_secs == 0 {
            return Err(LensError::Config(
                "gemini.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// OpenFDA
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFdaConfig {
    /// API key (usually from OPENFDA_API_KEY). Never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// API root URL
    pub api_base: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Client-side request budget per minute (0 disables)
    pub requests_per_minute: u32,
}

impl std::fmt::Debug for OpenFdaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFdaConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

impl Default for OpenFdaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: constants::openfda::DEFAULT_API_BASE.to_string(),
            timeout_secs: constants::network::DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: constants::network::CONNECTION_TIMEOUT_SECS,
            requests_per_minute: constants::openfda::DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

// =============================================================================
// Retry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// First backoff delay in milliseconds
    pub min_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,

    /// Backoff multiplier
    pub factor: f32,

    /// Randomize delays to spread out retries
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::retry::DEFAULT_MAX_ATTEMPTS,
            min_delay_ms: constants::retry::MIN_DELAY_MS,
            max_delay_ms: constants::retry::MAX_DELAY_SECS * 1000,
            factor: constants::retry::BACKOFF_FACTOR,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms))
    }

    /// Retries after the first attempt
    pub fn max_retries(&self) -> usize {
        self.max_attempts.saturating_sub(1) as usize
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Route fetches through the result cache
    pub enabled: bool,

    /// Entry time-to-live in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: constants::cache::DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// =============================================================================
// Fetch
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Concurrent requests per batch
    pub pool_size: usize,

    /// Default page size
    pub page_size: u32,

    /// Record ceiling for paginated fetches
    pub max_records: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pool_size: constants::fetch::DEFAULT_POOL_SIZE,
            page_size: constants::openfda::DEFAULT_PAGE_SIZE,
            max_records: constants::openfda::DEFAULT_MAX_RECORDS,
        }
    }
}

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (usually from GEMINI_API_KEY). Never serialized to output
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// API root URL
    pub api_base: String,

    /// Upper bound on one summarization call, in seconds
    pub timeout_secs: u64,

    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Rows of a table included in the prompt
    pub max_summary_rows: usize,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_summary_rows", &self.max_summary_rows)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: constants::ai::DEFAULT_MODEL.to_string(),
            api_base: constants::ai::DEFAULT_API_BASE.to_string(),
            timeout_secs: constants::ai::DEFAULT_TIMEOUT_SECS,
            temperature: constants::ai::DEFAULT_TEMPERATURE,
            max_output_tokens: constants::ai::DEFAULT_MAX_OUTPUT_TOKENS,
            max_summary_rows: constants::ai::DEFAULT_MAX_SUMMARY_ROWS,
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(matches!(config.validate(), Err(LensError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = Config::default();
        config.fetch.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_page() {
        let mut config = Config::default();
        config.fetch.page_size = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_temperature() {
        let mut config = Config::default();
        config.gemini.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_keys_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.openfda.api_key = Some("fda-secret".to_string());
        config.gemini.api_key = Some("gemini-secret".to_string());

        let debug = format!("{:?}", config);
        assert!(!debug.contains("fda-secret"));
        assert!(!debug.contains("gemini-secret"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_retry_helpers() {
        let retry = RetryConfig {
            max_attempts: 4,
            min_delay_ms: 200,
            max_delay_ms: 100,
            ..Default::default()
        };
        assert_eq!(retry.max_retries(), 3);
        assert_eq!(retry.max_delay(), Duration::from_millis(200));
    }
}
