//! Fetch Command
//!
//! Fetch raw records from one OpenFDA endpoint.
//!
//! Usage:
//!   fdalens fetch drug/event --search 'serious:1' --from 2024-01-01 --to 2024-12-31
//!   fdalens fetch food/enforcement --all --max-records 500 -f json

use std::path::Path;

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::cli::util::DateArgs;
use crate::openfda::FetchSource;
use crate::types::{Endpoint, FetchRequest, Result};

pub struct FetchOptions {
    pub endpoint: Endpoint,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub skip: u32,
    pub all: bool,
    pub max_records: Option<usize>,
    pub dates: DateArgs,
    pub format: String,
}

pub async fn run(config_path: Option<&Path>, options: FetchOptions) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    let output = Output::new();

    let page_size = options.limit.unwrap_or(ctx.config.fetch.page_size);
    let mut request = FetchRequest::new(options.endpoint).page(page_size, options.skip);
    if let Some(search) = &options.search {
        request = request.search(search);
    }
    let request = options.dates.apply(options.endpoint, request)?;

    let result = if options.all {
        let max = options.max_records.unwrap_or(ctx.config.fetch.max_records);
        ctx.orchestrator.fetch_all(&request, max).await
    } else {
        ctx.orchestrator.source().fetch(&request).await
    };

    if options.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output.fetch_status(&result);
        for record in &result.records {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    match result.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
