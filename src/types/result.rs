//! Fetch results
//!
//! A [`FetchResult`] always comes back, success or not; failures ride along
//! in `error` so a batch never aborts on one bad request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use super::request::FetchRequest;

/// Outcome of one OpenFDA request
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub request: FetchRequest,
    /// Records in API order
    pub records: Vec<Value>,
    /// `meta.results.total`, when the API reports it
    pub total: Option<u64>,
    pub error: Option<ApiError>,
    /// HTTP attempts made, retries included
    pub attempts: u32,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn success(
        request: FetchRequest,
        records: Vec<Value>,
        total: Option<u64>,
        attempts: u32,
    ) -> Self {
        Self {
            request,
            records,
            total,
            error: None,
            attempts,
            fetched_at: Utc::now(),
        }
    }

    pub fn failure(request: FetchRequest, error: ApiError, attempts: u32) -> Self {
        Self {
            request,
            records: Vec::new(),
            total: None,
            error: Some(error),
            attempts,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decode `count=` aggregates
    ///
    /// Count queries return `{term, count}` records, or `{time, count}` for
    /// date fields. Records of any other shape are skipped.
    pub fn term_counts(&self) -> Vec<TermCount> {
        self.records.iter().filter_map(TermCount::from_record).collect()
    }

    /// Whether the records are `{time, count}` buckets from a date field
    pub fn is_time_series(&self) -> bool {
        self.records
            .first()
            .is_some_and(|record| record.get("time").is_some())
    }
}

/// One bucket of a count aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

impl TermCount {
    pub fn new(term: impl Into<String>, count: u64) -> Self {
        Self {
            term: term.into(),
            count,
        }
    }

    fn from_record(record: &Value) -> Option<Self> {
        let count = record.get("count")?.as_u64()?;
        let term = match record.get("term").or_else(|| record.get("time"))? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        Some(Self { term, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Endpoint, ErrorCategory};
    use serde_json::json;

    #[test]
    fn test_term_counts_decoding() {
        let request = FetchRequest::new(Endpoint::DrugEvent).count("patient.patientsex");
        let result = FetchResult::success(
            request,
            vec![
                json!({"term": "ASPIRIN", "count": 42}),
                json!({"term": 2, "count": 7}),
                json!({"time": "20240101", "count": 3}),
                json!({"unexpected": true}),
            ],
            None,
            1,
        );

        let counts = result.term_counts();
        assert_eq!(
            counts,
            vec![
                TermCount::new("ASPIRIN", 42),
                TermCount::new("2", 7),
                TermCount::new("20240101", 3),
            ]
        );
    }

    #[test]
    fn test_failure_has_no_records() {
        let request = FetchRequest::new(Endpoint::FoodEvent);
        let result = FetchResult::failure(request, ApiError::client("bad"), 1);
        assert!(!result.is_ok());
        assert!(result.is_empty());
        assert_eq!(
            result.error.as_ref().map(|e| e.category),
            Some(ErrorCategory::Client)
        );
    }
}
