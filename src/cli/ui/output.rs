use console::style;

use crate::cache::CacheStats;
use crate::types::{ApiError, FetchResult, TabularSummary};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Category-tagged failure line
    pub fn api_error(&self, context: &str, error: &ApiError) {
        eprintln!(
            "{} {} {} {}",
            style("✗").red(),
            context,
            style(format!("[{}]", error.category)).red().bold(),
            error.message
        );
    }

    /// One-line outcome of a fetch
    pub fn fetch_status(&self, result: &FetchResult) {
        let label = result.request.endpoint.to_string();
        match &result.error {
            None => {
                let total = result
                    .total
                    .map(|t| format!(" of {}", t))
                    .unwrap_or_default();
                self.success(&format!(
                    "{}: {} records{} ({} attempt{})",
                    label,
                    result.len(),
                    total,
                    result.attempts,
                    if result.attempts == 1 { "" } else { "s" }
                ));
            }
            Some(error) => self.api_error(&format!("{}:", label), error),
        }
    }

    pub fn table(&self, summary: &TabularSummary) {
        if summary.is_empty() {
            println!("{}", style("(no rows)").dim());
            return;
        }
        let rendered = summary.render();
        let mut lines = rendered.lines();
        if let Some(header) = lines.next() {
            println!("{}", style(header).bold());
        }
        for line in lines {
            println!("{}", line);
        }
    }

    pub fn cache_stats(&self, stats: &CacheStats) {
        println!(
            "{}",
            style(format!(
                "cache: {} hits, {} misses, {} entries ({:.0}% hit rate)",
                stats.hits,
                stats.misses,
                stats.entries,
                stats.hit_rate() * 100.0
            ))
            .dim()
        );
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
