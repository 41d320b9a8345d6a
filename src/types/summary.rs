//! Tabular summaries and AI summary request/response types

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;

use super::error::ApiError;
use super::result::TermCount;

/// Normalize count buckets for display and prompting
///
/// Trims labels, drops a trailing period, upper-cases, discards empty terms,
/// merges duplicates by summing, sorts by count (descending, ties by term),
/// and keeps the first `top_n`.
pub fn clean_term_counts(counts: Vec<TermCount>, top_n: usize) -> Vec<TermCount> {
    let mut merged: HashMap<String, u64> = HashMap::new();
    for TermCount { term, count } in counts {
        let term = term.trim();
        let term = term.strip_suffix('.').unwrap_or(term).trim().to_uppercase();
        if term.is_empty() {
            continue;
        }
        *merged.entry(term).or_default() += count;
    }

    let mut cleaned: Vec<TermCount> = merged
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();
    cleaned.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    cleaned.truncate(top_n);
    cleaned
}

/// Order time-series buckets by period, oldest first
///
/// Periods are `YYYYMMDD` strings, so lexical order is chronological. No
/// bucket is dropped; repeated periods are summed.
pub fn chronological_counts(counts: Vec<TermCount>) -> Vec<TermCount> {
    let mut periods: BTreeMap<String, u64> = BTreeMap::new();
    for TermCount { term, count } in counts {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        *periods.entry(term.to_string()).or_default() += count;
    }
    periods
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect()
}

/// Column headers plus rows of display strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabularSummary {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularSummary {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Two-column (or three, with percentages) table of count buckets
    pub fn from_term_counts(
        term_column: &str,
        count_column: &str,
        counts: &[TermCount],
        with_percentage: bool,
    ) -> Self {
        let mut columns = vec![term_column.to_string(), count_column.to_string()];
        if with_percentage {
            columns.push("Percentage".to_string());
        }
        let total: u64 = counts.iter().map(|c| c.count).sum();

        let mut summary = Self::new(columns);
        for bucket in counts {
            let mut row = vec![bucket.term.clone(), bucket.count.to_string()];
            if with_percentage {
                let pct = if total == 0 {
                    0.0
                } else {
                    bucket.count as f64 / total as f64 * 100.0
                };
                row.push(format!("{:.2}%", pct));
            }
            summary.push_row(row);
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Copy of the first `n` rows
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Render as fixed-width text, columns separated by two spaces
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(idx) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }

        let format_line = |cells: &[String]| {
            cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| format!("{:<width$}", cell, width = widths[idx]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(format_line(&self.columns));
        for row in &self.rows {
            lines.push(format_line(row));
        }
        lines.join("\n")
    }
}

/// Input to the summarization adapter
#[derive(Debug, Clone, Serialize)]
pub struct AiSummaryRequest {
    /// What the table describes, e.g. "adverse events by patient age"
    pub domain_label: String,
    pub summary: TabularSummary,
    pub question: Option<String>,
}

impl AiSummaryRequest {
    pub fn new(domain_label: impl Into<String>, summary: TabularSummary) -> Self {
        Self {
            domain_label: domain_label.into(),
            summary,
            question: None,
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Question with whitespace trimmed; blank counts as none
    pub fn question(&self) -> Option<&str> {
        self.question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Output of the summarization adapter: generated text or a tagged error
#[derive(Debug, Clone, Serialize)]
pub struct AiSummaryResponse {
    pub text: Option<String>,
    pub error: Option<ApiError>,
    pub model: String,
    pub elapsed: Duration,
}

impl AiSummaryResponse {
    pub fn success(text: String, model: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            text: Some(text),
            error: None,
            model: model.into(),
            elapsed,
        }
    }

    pub fn failure(error: ApiError, model: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            text: None,
            error: Some(error),
            model: model.into(),
            elapsed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
