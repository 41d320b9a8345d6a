//! Batch Command
//!
//! Run several count aggregations concurrently, one table per query.
//! Ctrl-C abandons the batch.
//!
//! Usage:
//!   fdalens batch drug/event:patient.patientsex food/enforcement:classification.exact:Recalls

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::count::{count_request, summarize_counts};
use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::cli::util::{DateArgs, parse_count_query};
use crate::types::Result;

pub async fn run(
    config_path: Option<&Path>,
    queries: &[String],
    search: Option<&str>,
    top: usize,
    dates: &DateArgs,
    format: &str,
) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let output = Output::new();

    let mut labels = Vec::with_capacity(queries.len());
    let mut fields = Vec::with_capacity(queries.len());
    let mut requests = Vec::with_capacity(queries.len());
    for query in queries {
        let (label, endpoint, field) = parse_count_query(query)?;
        requests.push(dates.apply(endpoint, count_request(endpoint, &field, search, top))?);
        labels.push(label);
        fields.push(field);
    }

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received");
            ctrl_c.cancel();
        }
    });

    let outcome = ctx
        .orchestrator
        .fetch_many_cancellable(requests, &token)
        .await;
    watcher.abort();
    let results = outcome?;

    let mut first_error = None;
    let mut tables = serde_json::Map::new();
    for ((label, field), result) in labels.iter().zip(&fields).zip(&results) {
        if let Some(error) = &result.error {
            output.api_error(&format!("{}:", label), error);
            first_error.get_or_insert_with(|| error.clone());
            continue;
        }
        let summary = summarize_counts(result, field, top);
        if format == "json" {
            tables.insert(label.clone(), serde_json::to_value(&summary)?);
        } else {
            output.section(label);
            output.table(&summary);
        }
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&tables)?);
    } else if let Some(cache) = &ctx.cache {
        output.cache_stats(&cache.stats());
    }

    match first_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
