//! AI Summarization
//!
//! Turns a [`TabularSummary`](crate::types::TabularSummary) into a prompt,
//! sends it to a language model, and returns the commentary.
//!
//! ## Modules
//!
//! - `gemini`: Google Generative Language `generateContent` client
//! - `prompt`: Deterministic prompt construction
//! - `summarizer`: Timeout-bounded, never-failing summarization entry point
//! - `timeout`: `tokio::time::timeout` helpers

mod gemini;
mod prompt;
mod summarizer;
mod timeout;

pub use gemini::GeminiModel;
pub use prompt::build_prompt;
pub use summarizer::Summarizer;
pub use timeout::with_timeout;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::Result;

/// Generated text plus usage reported by the provider
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub usage: TokenUsage,
}

/// Token usage metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Input tokens (prompt)
    pub input_tokens: u32,
    /// Output tokens (response)
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Free-text generation backend
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<ModelReply>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

pub type SharedModel = Arc<dyn TextModel>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total_saturates() {
        let usage = TokenUsage {
            input_tokens: 1200,
            output_tokens: 300,
        };
        assert_eq!(usage.total(), 1500);

        let huge = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 10,
        };
        assert_eq!(huge.total(), u32::MAX);
    }
}
