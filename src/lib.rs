//! fdalens - Cached, Concurrent OpenFDA Access with AI Commentary
//!
//! Integration layer between the OpenFDA REST API and a Gemini language
//! model: fetch FDA regulatory datasets, cache and parallelize the requests,
//! and turn aggregated counts into natural-language trend commentary.
//!
//! ## Core Features
//!
//! - **OpenFDA Adapter**: Retry with exponential backoff on 429 and network
//!   failures, client-side rate limiting, pagination
//! - **Result Cache**: TTL cache with order-independent keys and in-flight
//!   de-duplication
//! - **Fetch Orchestrator**: Bounded worker pool with positional results and
//!   cancellation
//! - **AI Summarization**: Deterministic prompts, timeout-bounded Gemini calls
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use fdalens::{CachedSource, Config, Endpoint, FetchOrchestrator, FetchRequest};
//! use fdalens::{OpenFdaClient, ResultCache};
//!
//! let config = Config::default();
//! let client = OpenFdaClient::new(&config.openfda, config.retry.clone())?;
//! let cache = Arc::new(ResultCache::new(config.cache.ttl()));
//! let orchestrator = FetchOrchestrator::new(
//!     Arc::new(CachedSource::new(client, cache)),
//!     config.fetch.pool_size,
//! );
//!
//! let results = orchestrator
//!     .fetch_many(vec![
//!         FetchRequest::new(Endpoint::DrugEvent).count("patient.patientsex"),
//!         FetchRequest::new(Endpoint::FoodEnforcement).count("classification.exact"),
//!     ])
//!     .await;
//! ```
//!
//! ## Modules
//!
//! - [`openfda`]: HTTP client, rate limiter, pagination
//! - [`cache`]: TTL result cache
//! - [`fetch`]: Concurrent fetch orchestrator
//! - [`ai`]: Gemini adapter and summarizer
//! - [`config`]: Layered configuration

pub mod ai;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod fetch;
pub mod openfda;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{ApiError, ErrorCategory, LensError, Result};

// Requests and Results
pub use types::{
    AiSummaryRequest, AiSummaryResponse, Domain, Endpoint, FetchRequest, FetchResult,
    TabularSummary, TermCount,
};

// =============================================================================
// Adapter Re-exports
// =============================================================================

pub use cache::{CacheKey, CacheStats, CachedSource, ResultCache};
pub use fetch::FetchOrchestrator;
pub use openfda::{FetchSource, OpenFdaClient, SharedSource, fetch_all};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{GeminiModel, SharedModel, Summarizer, TextModel, with_timeout};
