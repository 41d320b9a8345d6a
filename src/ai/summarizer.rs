//! Summarization entry point
//!
//! One model call per request, bounded by a timeout. Every failure comes back
//! inside the [`AiSummaryResponse`] tagged as an AI service error.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use super::{SharedModel, build_prompt, with_timeout};
use crate::config::GeminiConfig;
use crate::types::{AiSummaryRequest, AiSummaryResponse, ApiError, ErrorCategory, LensError};

pub struct Summarizer {
    model: SharedModel,
    timeout: Duration,
    max_rows: usize,
}

impl Summarizer {
    pub fn new(model: SharedModel, timeout: Duration, max_rows: usize) -> Self {
        Self {
            model,
            timeout,
            max_rows,
        }
    }

    pub fn from_config(model: SharedModel, config: &GeminiConfig) -> Self {
        Self::new(model, config.timeout(), config.max_summary_rows)
    }

    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Generate commentary for `request`; never returns an error directly
    pub async fn summarize(&self, request: &AiSummaryRequest) -> AiSummaryResponse {
        let start = Instant::now();
        let model_name = self.model.model().to_string();

        if request.summary.is_empty() {
            warn!(label = %request.domain_label, "No data to summarize");
            return AiSummaryResponse::failure(
                ApiError::ai_service("No data available to summarize"),
                model_name,
                start.elapsed(),
            );
        }

        let prompt = build_prompt(request, self.max_rows);
        let outcome = with_timeout(
            self.timeout,
            self.model.generate(&prompt),
            "AI summarization",
        )
        .await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(reply) => {
                info!(
                    label = %request.domain_label,
                    model = %model_name,
                    elapsed_ms = elapsed.as_millis() as u64,
                    tokens = reply.usage.total(),
                    "Summary generated"
                );
                AiSummaryResponse::success(reply.text, model_name, elapsed)
            }
            Err(e) => {
                let error = Self::to_ai_error(e);
                warn!(
                    label = %request.domain_label,
                    model = %model_name,
                    error = %error,
                    "Summary failed"
                );
                AiSummaryResponse::failure(error, model_name, elapsed)
            }
        }
    }

    fn to_ai_error(err: LensError) -> ApiError {
        match err {
            LensError::Api(api) => ApiError {
                category: ErrorCategory::AiService,
                ..api
            },
            LensError::Timeout { duration, .. } => {
                ApiError::ai_service(format!("Model did not respond within {:?}", duration))
            }
            other => ApiError::ai_service(other.to_string()),
        }
    }
}
