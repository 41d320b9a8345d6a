//! Result Cache
//!
//! In-memory TTL cache of [`FetchResult`]s keyed by endpoint and query
//! parameters.
//!
//! ## Semantics
//!
//! - Keys are canonical: parameter order never changes the key
//! - Failures are cached like successes, so a failing endpoint is not hit
//!   again until its entry expires
//! - Expired entries are evicted lazily on the next lookup
//! - Concurrent lookups of one missing key share a single in-flight fetch

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::debug;

use crate::openfda::FetchSource;
use crate::types::{Endpoint, FetchRequest, FetchResult, QueryParams};

// =============================================================================
// Cache Key
// =============================================================================

/// Canonical `(endpoint, parameters)` key
///
/// Parameters are sorted and form-encoded, so `{a, b}` and `{b, a}` produce
/// the same key and no value can spill into a neighbouring pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: Endpoint, params: &QueryParams) -> Self {
        let mut pairs: Vec<(&String, &String)> = params.iter().collect();
        pairs.sort();

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();

        Self(format!("{}?{}", endpoint.id(), query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// =============================================================================
// Result Cache
// =============================================================================

#[derive(Debug)]
struct CachedValue {
    result: FetchResult,
    stored_at: Instant,
}

impl CachedValue {
    fn new(result: FetchResult) -> Self {
        Self {
            result,
            stored_at: Instant::now(),
        }
    }
}

type Slot = Arc<OnceCell<CachedValue>>;

/// TTL cache shared by every fetch of a session
pub struct ResultCache {
    entries: DashMap<CacheKey, Slot>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached result for `(endpoint, params)` or fetch and store it
    ///
    /// `fetch_fn` runs only on a miss or after expiry. Callers that arrive
    /// while a fetch for the same key is running wait for it instead of
    /// issuing their own.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        fetch_fn: F,
    ) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        let key = CacheKey::new(endpoint, params);

        let slot = loop {
            let slot = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            match slot.get() {
                Some(value) if self.is_fresh(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache hit");
                    return value.result.clone();
                }
                Some(_) => {
                    self.evict(&key, &slot);
                }
                None => break slot,
            }
        };

        let mut fetched = false;
        let value = slot
            .get_or_init(|| {
                fetched = true;
                async move { CachedValue::new(fetch_fn().await) }
            })
            .await;

        if fetched {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, ok = value.result.is_ok(), "Cache miss, stored");
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Joined in-flight fetch");
        }

        value.result.clone()
    }

    /// Fetch unconditionally and replace whatever is cached for the key
    pub async fn refresh<F, Fut>(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        fetch_fn: F,
    ) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        let key = CacheKey::new(endpoint, params);
        let result = fetch_fn().await;
        self.misses.fetch_add(1, Ordering::Relaxed);

        let slot = Arc::new(OnceCell::new_with(Some(CachedValue::new(result.clone()))));
        self.entries.insert(key.clone(), slot);
        debug!(key = %key, "Cache refreshed");

        result
    }

    /// Drop the entry for `(endpoint, params)`; returns whether one existed
    pub fn invalidate(&self, endpoint: Endpoint, params: &QueryParams) -> bool {
        self.entries
            .remove(&CacheKey::new(endpoint, params))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, slot| match slot.get() {
            Some(value) if !self.is_fresh(value) => {
                removed += 1;
                false
            }
            _ => true,
        });
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Entries currently held, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    fn is_fresh(&self, value: &CachedValue) -> bool {
        value.stored_at.elapsed() < self.ttl
    }

    /// Remove `slot` only if it is still the one stored under `key`
    fn evict(&self, key: &CacheKey, slot: &Slot) {
        if self
            .entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, slot))
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Evicted expired entry");
        }
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Cached Source
// =============================================================================

/// [`FetchSource`] that answers from a [`ResultCache`] before the inner source
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<ResultCache>,
}

impl<S: FetchSource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<ResultCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }
}

#[async_trait]
impl<S: FetchSource> FetchSource for CachedSource<S> {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        self.cache
            .get_or_fetch(request.endpoint, &request.query_params(), || {
                self.inner.fetch(request)
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiError;
    use futures::future::join_all;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const TTL: Duration = Duration::from_secs(60);

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ok_result(marker: u64) -> FetchResult {
        FetchResult::success(
            FetchRequest::new(Endpoint::DrugEvent),
            vec![json!({ "marker": marker })],
            Some(1),
            1,
        )
    }

    proptest! {
        #[test]
        fn prop_key_ignores_insertion_order(
            pairs in proptest::collection::btree_map("[a-z_.]{1,12}", "[ -~]{0,24}", 0..8)
        ) {
            let mut forward = QueryParams::new();
            for (k, v) in pairs.iter() {
                forward.insert(k.clone(), v.clone());
            }
            let mut backward = QueryParams::new();
            for (k, v) in pairs.iter().rev() {
                backward.insert(k.clone(), v.clone());
            }

            prop_assert_eq!(
                CacheKey::new(Endpoint::FoodEnforcement, &forward),
                CacheKey::new(Endpoint::FoodEnforcement, &backward)
            );
        }
    }

    #[test]
    fn test_key_distinguishes_endpoint_and_values() {
        let p = params(&[("search", "aspirin")]);
        assert_ne!(
            CacheKey::new(Endpoint::DrugEvent, &p),
            CacheKey::new(Endpoint::DrugLabel, &p)
        );

        // A value containing separators must not alias a second pair
        let packed = params(&[("a", "1&b=2")]);
        let split = params(&[("a", "1"), ("b", "2")]);
        assert_ne!(
            CacheKey::new(Endpoint::DrugEvent, &packed),
            CacheKey::new(Endpoint::DrugEvent, &split)
        );
    }

    #[test]
    fn test_key_format() {
        let key = CacheKey::new(
            Endpoint::DrugEvent,
            &params(&[("search", "a b"), ("limit", "10")]),
        );
        assert_eq!(key.as_str(), "drug/event?limit=10&search=a+b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_skips_fetch() {
        let cache = ResultCache::new(TTL);
        let p = params(&[("search", "x")]);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let result = cache
                .get_or_fetch(Endpoint::DrugEvent, &p, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { ok_result(1) }
                })
                .await;
            assert_eq!(result.records[0]["marker"], 1);
            tokio::time::advance(Duration::from_secs(10)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let cache = ResultCache::new(TTL);
        let p = QueryParams::new();

        cache
            .get_or_fetch(Endpoint::DrugEvent, &p, || async { ok_result(1) })
            .await;
        tokio::time::advance(TTL).await;

        let result = cache
            .get_or_fetch(Endpoint::DrugEvent, &p, || async { ok_result(2) })
            .await;
        assert_eq!(result.records[0]["marker"], 2);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_after_expiry_fetch_once() {
        let cache = ResultCache::new(TTL);
        let p = params(&[("count", "receivedate")]);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_fetch(Endpoint::DeviceEvent, &p, || async { ok_result(0) })
            .await;
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        let lookups = (0..10).map(|_| {
            cache.get_or_fetch(Endpoint::DeviceEvent, &p, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    ok_result(7)
                }
            })
        });
        let results = join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.records[0]["marker"] == 7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_cached() {
        let cache = ResultCache::new(TTL);
        let p = params(&[("search", "broken")]);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_fetch(Endpoint::FoodEvent, &p, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async {
                        FetchResult::failure(
                            FetchRequest::new(Endpoint::FoodEvent),
                            ApiError::network("down"),
                            4,
                        )
                    }
                })
                .await;
            assert!(!result.is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_and_invalidate() {
        let cache = ResultCache::new(TTL);
        let p = params(&[("search", "x")]);

        cache
            .get_or_fetch(Endpoint::DrugNdc, &p, || async { ok_result(1) })
            .await;
        let refreshed = cache
            .refresh(Endpoint::DrugNdc, &p, || async { ok_result(2) })
            .await;
        assert_eq!(refreshed.records[0]["marker"], 2);

        let cached = cache
            .get_or_fetch(Endpoint::DrugNdc, &p, || async { ok_result(3) })
            .await;
        assert_eq!(cached.records[0]["marker"], 2);

        assert!(cache.invalidate(Endpoint::DrugNdc, &p));
        assert!(!cache.invalidate(Endpoint::DrugNdc, &p));
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_and_clear() {
        let cache = ResultCache::new(TTL);
        cache
            .get_or_fetch(Endpoint::DrugEvent, &params(&[("a", "1")]), || async {
                ok_result(1)
            })
            .await;
        tokio::time::advance(Duration::from_secs(40)).await;
        cache
            .get_or_fetch(Endpoint::DrugEvent, &params(&[("a", "2")]), || async {
                ok_result(2)
            })
            .await;
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FetchSource for CountingSource {
        async fn fetch(&self, request: &FetchRequest) -> FetchResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            FetchResult::success(request.clone(), vec![json!({ "marker": n })], None, 1)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_cached_source_keys_include_paging() {
        let cache = Arc::new(ResultCache::new(TTL));
        let source = CachedSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
            },
            cache.clone(),
        );
        let request = FetchRequest::new(Endpoint::DeviceRecall).search("pump");

        source.fetch(&request).await;
        source.fetch(&request).await;
        source.fetch(&request.with_page(100, 100)).await;

        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(source.name(), "counting");
    }
}
