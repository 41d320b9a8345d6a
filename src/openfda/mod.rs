//! OpenFDA Adapter
//!
//! HTTP client, client-side rate limiting, and pagination over the OpenFDA
//! dataset endpoints. Everything above this module talks to a
//! [`FetchSource`], so the cache and tests can stand in for the network.

mod client;
mod pagination;
mod rate_limit;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::OpenFdaClient;
pub use pagination::fetch_all;
pub use rate_limit::RateLimiter;

use crate::types::{FetchRequest, FetchResult};

/// Anything that can answer a [`FetchRequest`]
///
/// Implementations never fail outright: errors are carried in the returned
/// [`FetchResult`].
#[async_trait]
pub trait FetchSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult;

    /// Source name for logs
    fn name(&self) -> &str;
}

pub type SharedSource = Arc<dyn FetchSource>;

#[async_trait]
impl<S: FetchSource + ?Sized> FetchSource for Arc<S> {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        (**self).fetch(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
