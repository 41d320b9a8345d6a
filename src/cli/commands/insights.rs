//! Insights Command
//!
//! Aggregate one field and ask the language model about it.
//!
//! Usage:
//!   fdalens insights device/event event_type --question "Which event type grows fastest?"

use std::path::Path;

use super::count::{count_request, summarize_counts};
use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::cli::util::DateArgs;
use crate::openfda::FetchSource;
use crate::types::{AiSummaryRequest, Endpoint, Result};

pub struct InsightsOptions {
    pub endpoint: Endpoint,
    pub field: String,
    pub search: Option<String>,
    pub question: Option<String>,
    pub top: usize,
    pub dates: DateArgs,
    pub format: String,
}

pub async fn run(config_path: Option<&Path>, options: InsightsOptions) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let summarizer = ctx.summarizer()?;
    let output = Output::new();

    let request = count_request(
        options.endpoint,
        &options.field,
        options.search.as_deref(),
        options.top,
    );
    let request = options.dates.apply(options.endpoint, request)?;
    let result = ctx.orchestrator.source().fetch(&request).await;
    if let Some(error) = result.error {
        output.api_error(&format!("{}:", options.endpoint), &error);
        return Err(error.into());
    }

    let summary = summarize_counts(&result, &options.field, options.top);
    let label = format!(
        "{} {} by {}",
        options.endpoint.domain(),
        options.endpoint,
        options.field
    );
    let mut ai_request = AiSummaryRequest::new(label, summary);
    if let Some(question) = options.question {
        ai_request = ai_request.with_question(question);
    }

    let response = summarizer.summarize(&ai_request).await;

    if options.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "request": ai_request,
                "response": response,
            }))?
        );
    } else {
        output.header(&ai_request.domain_label);
        output.table(&ai_request.summary);
        output.section(&format!("Insights ({})", response.model));
        if let Some(text) = &response.text {
            println!("{}", text.trim());
        }
    }

    match response.error {
        Some(error) => {
            output.api_error("Summary:", &error);
            Err(error.into())
        }
        None => Ok(()),
    }
}
