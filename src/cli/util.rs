//! CLI Common Utilities
//!
//! Builds the adapters every command needs from the loaded configuration.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;

use crate::ai::{GeminiModel, Summarizer};
use crate::cache::{CachedSource, ResultCache};
use crate::config::{Config, ConfigLoader};
use crate::fetch::FetchOrchestrator;
use crate::openfda::{OpenFdaClient, SharedSource};
use crate::types::{Endpoint, FetchRequest, LensError, Result};

/// Command execution context
///
/// Owns the configuration, the (optionally cached) OpenFDA source and the
/// orchestrator on top of it. The Gemini adapter is built on demand so that
/// commands without AI output never require `GEMINI_API_KEY`.
pub struct CommandContext {
    pub config: Config,
    pub orchestrator: FetchOrchestrator,
    pub cache: Option<Arc<ResultCache>>,
}

impl CommandContext {
    /// Load configuration and build the fetch stack
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = ConfigLoader::load_with(config_path)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let client = OpenFdaClient::new(&config.openfda, config.retry.clone())?;

        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResultCache::new(config.cache.ttl())));

        let source: SharedSource = match &cache {
            Some(cache) => Arc::new(CachedSource::new(client, cache.clone())),
            None => Arc::new(client),
        };

        let orchestrator = FetchOrchestrator::new(source, config.fetch.pool_size);

        Ok(Self {
            config,
            orchestrator,
            cache,
        })
    }

    /// Summarizer over the configured Gemini model
    pub fn summarizer(&self) -> Result<Summarizer> {
        let model = GeminiModel::new(&self.config.gemini)?;
        Ok(Summarizer::from_config(Arc::new(model), &self.config.gemini))
    }
}

/// `--from/--to` date window shared by the query commands
#[derive(Debug, Clone, Default, Args)]
pub struct DateArgs {
    #[arg(long, requires = "to", help = "Start date, YYYY-MM-DD")]
    pub from: Option<NaiveDate>,
    #[arg(long, requires = "from", help = "End date, YYYY-MM-DD")]
    pub to: Option<NaiveDate>,
    #[arg(long, help = "Date field to filter on (default: per endpoint)")]
    pub date_field: Option<String>,
}

impl DateArgs {
    /// Add the date window to `request`, if one was given
    pub fn apply(&self, endpoint: Endpoint, request: FetchRequest) -> Result<FetchRequest> {
        let (Some(from), Some(to)) = (self.from, self.to) else {
            return Ok(request);
        };
        if from > to {
            return Err(LensError::Config(format!(
                "--from {} is after --to {}",
                from, to
            )));
        }

        let field = match self.date_field.as_deref().map(str::trim) {
            Some(field) if !field.is_empty() => field,
            _ => endpoint.date_field().ok_or_else(|| {
                LensError::Config(format!(
                    "{} has no default date field; pass --date-field",
                    endpoint
                ))
            })?,
        };
        Ok(request.between(field, from, to))
    }
}

/// Parse an endpoint argument such as `drug/event`
pub fn parse_endpoint(value: &str) -> std::result::Result<Endpoint, String> {
    value.parse()
}

/// Split a batch query `endpoint:field[:label]`
pub fn parse_count_query(query: &str) -> Result<(String, Endpoint, String)> {
    let mut parts = query.splitn(3, ':');
    let (Some(endpoint), Some(field)) = (parts.next(), parts.next()) else {
        return Err(LensError::Config(format!(
            "Invalid batch query '{}'. Expected endpoint:field[:label]",
            query
        )));
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(LensError::Config(format!("Missing count field in '{}'", query)));
    }

    let endpoint: Endpoint = endpoint.parse().map_err(LensError::Config)?;
    let label = parts
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", endpoint, field));

    Ok((label, endpoint, field.to_string()))
}
