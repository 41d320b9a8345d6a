//! Concurrent Fetch Orchestrator
//!
//! Runs independent OpenFDA requests with a bounded number in flight and
//! hands the results back in input order. One request failing never cancels
//! its siblings: each [`FetchResult`] carries its own success or error.

use std::collections::BTreeMap;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::openfda::{self, FetchSource, SharedSource};
use crate::types::{FetchRequest, FetchResult, LensError, Result};

/// Bounded-concurrency batch runner over a [`FetchSource`]
#[derive(Clone)]
pub struct FetchOrchestrator {
    source: SharedSource,
    pool_size: usize,
}

impl FetchOrchestrator {
    /// `pool_size` is clamped to at least one
    pub fn new(source: SharedSource, pool_size: usize) -> Self {
        Self {
            source,
            pool_size: pool_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Fetch every request; `results[i]` answers `requests[i]`
    #[instrument(skip(self, requests), fields(requests = requests.len(), pool = self.pool_size))]
    pub async fn fetch_many(&self, requests: Vec<FetchRequest>) -> Vec<FetchResult> {
        let total = requests.len();

        let mut indexed: Vec<(usize, FetchResult)> = futures::stream::iter(
            requests.into_iter().enumerate(),
        )
        .map(|(index, request)| {
            let source = self.source.clone();
            async move { (index, source.fetch(&request).await) }
        })
        .buffer_unordered(self.pool_size)
        .collect()
        .await;

        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<FetchResult> = indexed.into_iter().map(|(_, result)| result).collect();

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            warn!(total, failed, "Batch finished with failures");
        } else {
            info!(total, "Batch finished");
        }

        results
    }

    /// Fetch labelled requests, keyed by label
    ///
    /// Duplicate labels keep the last request's result.
    pub async fn fetch_named<K>(&self, requests: Vec<(K, FetchRequest)>) -> BTreeMap<K, FetchResult>
    where
        K: Ord,
    {
        let (labels, requests): (Vec<K>, Vec<FetchRequest>) = requests.into_iter().unzip();
        let results = self.fetch_many(requests).await;
        labels.into_iter().zip(results).collect()
    }

    /// [`fetch_many`](Self::fetch_many) that gives up when `token` fires
    ///
    /// Requests already sent may still complete upstream; their results are
    /// dropped and the batch returns [`LensError::Cancelled`].
    pub async fn fetch_many_cancellable(
        &self,
        requests: Vec<FetchRequest>,
        token: &CancellationToken,
    ) -> Result<Vec<FetchResult>> {
        let count = requests.len();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!(requests = count, "Batch cancelled, discarding in-flight results");
                Err(LensError::Cancelled(format!("batch of {} requests", count)))
            }
            results = self.fetch_many(requests) => Ok(results),
        }
    }

    /// Paginated fetch of one request through this orchestrator's source
    pub async fn fetch_all(&self, request: &FetchRequest, max_records: usize) -> FetchResult {
        openfda::fetch_all(self.source.as_ref(), request, max_records).await
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("source", &self.source.name())
            .field("pool_size", &self.pool_size)
            .finish()
    }
}
