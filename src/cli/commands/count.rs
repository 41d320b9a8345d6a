//! Count Command
//!
//! Run a `count=` aggregation and print the cleaned buckets as a table.
//!
//! Usage:
//!   fdalens count drug/event patient.reaction.reactionmeddrapt.exact --top 10

use std::path::Path;

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::cli::util::DateArgs;
use crate::constants::openfda::MAX_PAGE_SIZE;
use crate::openfda::FetchSource;
use crate::types::{
    Endpoint, FetchRequest, FetchResult, Result, TabularSummary, chronological_counts,
    clean_term_counts,
};

pub struct CountOptions {
    pub endpoint: Endpoint,
    pub field: String,
    pub search: Option<String>,
    pub top: usize,
    pub dates: DateArgs,
    pub format: String,
}

/// Count request asking for enough buckets to survive cleaning
pub fn count_request(
    endpoint: Endpoint,
    field: &str,
    search: Option<&str>,
    top: usize,
) -> FetchRequest {
    // Merging case variants can shrink the list, so ask for extra buckets
    let limit = top.saturating_mul(2).clamp(1, MAX_PAGE_SIZE as usize) as u32;
    let request = FetchRequest::new(endpoint).count(field).page(limit, 0);
    match search {
        Some(search) => request.search(search),
        None => request,
    }
}

/// Table for a count result
///
/// Term buckets are cleaned, ranked, cut to `top` and given percentages.
/// Time buckets keep every period in chronological order.
pub fn summarize_counts(result: &FetchResult, field: &str, top: usize) -> TabularSummary {
    if result.is_time_series() {
        let counts = chronological_counts(result.term_counts());
        return TabularSummary::from_term_counts(field, "Count", &counts, false);
    }
    let counts = clean_term_counts(result.term_counts(), top);
    TabularSummary::from_term_counts(field, "Count", &counts, true)
}

pub async fn run(config_path: Option<&Path>, options: CountOptions) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
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
    if options.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        output.header(&format!("{} by {}", options.endpoint, options.field));
        output.table(&summary);
    }
    Ok(())
}
