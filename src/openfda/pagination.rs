//! Multi-page fetches
//!
//! Walks `skip` forward one page at a time and merges the pages into a single
//! [`FetchResult`].

use tracing::{debug, warn};

use super::FetchSource;
use crate::constants::openfda as api;
use crate::types::{FetchRequest, FetchResult};

/// Fetch up to `max_records` records for `request`
///
/// Stops at the first error, an empty or short page, the API skip ceiling, or
/// once `max_records` have been collected. Records fetched before an error are
/// kept and the error is attached to the merged result. Count queries are not
/// paged and go out as a single request.
pub async fn fetch_all(
    source: &dyn FetchSource,
    request: &FetchRequest,
    max_records: usize,
) -> FetchResult {
    if request.is_count() || max_records == 0 {
        return source.fetch(request).await;
    }

    let page_size = (api::PAGINATION_PAGE_SIZE as usize).min(max_records) as u32;
    let mut offset = request.offset;
    let mut records = Vec::new();
    let mut total = None;
    let mut attempts = 0;
    let mut error = None;

    loop {
        let remaining = max_records - records.len();
        let limit = u32::try_from(remaining).unwrap_or(u32::MAX).min(page_size);
        let page = source.fetch(&request.with_page(limit, offset)).await;
        attempts += page.attempts;

        if let Some(e) = page.error {
            warn!(
                endpoint = %request.endpoint,
                offset,
                collected = records.len(),
                error = %e,
                "Pagination stopped on error"
            );
            error = Some(e);
            break;
        }

        total = total.or(page.total);
        let received = page.records.len();
        records.extend(page.records);
        debug!(endpoint = %request.endpoint, offset, received, "Fetched page");

        if received == 0 || received < limit as usize || records.len() >= max_records {
            break;
        }

        offset += received as u32;
        if offset > api::MAX_SKIP {
            debug!(offset, "Reached skip ceiling");
            break;
        }
        if total.is_some_and(|t| u64::from(offset) >= t) {
            break;
        }
    }

    records.truncate(max_records);
    let mut merged = FetchResult::success(request.clone(), records, total, attempts);
    merged.error = error;
    merged
}
