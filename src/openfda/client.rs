//! OpenFDA HTTP client
//!
//! Issues GET requests against OpenFDA dataset endpoints and decodes the
//! `{meta, results}` envelope. Rate limiting (429) and transport failures are
//! retried with exponential backoff; every other failure returns at once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::FetchSource;
use super::rate_limit::RateLimiter;
use crate::config::{OpenFdaConfig, RetryConfig};
use crate::constants::openfda as api;
use crate::types::{
    ApiError, Endpoint, ErrorClassifier, FetchRequest, FetchResult, LensError, QueryParams, Result,
};

/// OpenFDA client with secure API key handling
pub struct OpenFdaClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    base_url: Url,
    retry: RetryConfig,
    limiter: RateLimiter,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenFdaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenFdaClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry)
            .finish()
    }
}

impl OpenFdaClient {
    /// Build a client; fails with [`LensError::Auth`] when no API key is
    /// configured, before any request is made.
    pub fn new(config: &OpenFdaConfig, retry: RetryConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LensError::Auth(
                    "OpenFDA API key not found. Set OPENFDA_API_KEY or openfda.api_key"
                        .to_string(),
                )
            })?;

        let mut base = config.api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            LensError::Config(format!("Invalid openfda.api_base '{}': {}", config.api_base, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| LensError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key.to_string()),
            base_url,
            retry,
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            client,
        })
    }

    /// Fetch one page: `fetch(endpoint, params, page_size, offset)`
    pub async fn fetch_page(
        &self,
        endpoint: Endpoint,
        params: QueryParams,
        page_size: u32,
        offset: u32,
    ) -> FetchResult {
        let request = FetchRequest {
            endpoint,
            params,
            page_size,
            offset,
        };
        self.execute(&request).await
    }

    /// Fetch one request, retrying retryable failures
    pub async fn execute(&self, request: &FetchRequest) -> FetchResult {
        if let Err(reason) = request.validate() {
            warn!(request = %request.describe(), %reason, "Rejected request");
            return FetchResult::failure(request.clone(), ApiError::client(reason), 0);
        }

        let url = match self.build_url(request) {
            Ok(url) => url,
            Err(e) => return FetchResult::failure(request.clone(), e, 0),
        };

        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let url = &url;

        debug!(request = %request.describe(), "Fetching from OpenFDA");

        let outcome = (move || async move {
            counter.fetch_add(1, Ordering::Relaxed);
            self.send_once(url).await
        })
        .retry(self.backoff())
        .when(|e: &ApiError| e.is_retryable())
        .notify(|e: &ApiError, delay: Duration| {
            warn!(
                endpoint = %request.endpoint,
                category = %e.category,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Retrying OpenFDA request"
            );
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match outcome {
            Ok(page) => {
                info!(
                    endpoint = %request.endpoint,
                    records = page.records.len(),
                    total = ?page.total,
                    attempts,
                    "Fetched page"
                );
                FetchResult::success(request.clone(), page.records, page.total, attempts)
            }
            Err(e) => {
                warn!(
                    request = %request.describe(),
                    attempts,
                    error = %e,
                    "OpenFDA request failed"
                );
                FetchResult::failure(request.clone(), e, attempts)
            }
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.retry.min_delay())
            .with_max_delay(self.retry.max_delay())
            .with_factor(self.retry.factor)
            .with_max_times(self.retry.max_retries());
        if self.retry.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }

    /// Endpoint URL with query parameters, without the API key
    fn build_url(&self, request: &FetchRequest) -> std::result::Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(&request.endpoint.path())
            .map_err(|e| ApiError::client(format!("Invalid endpoint path: {}", e)))?;

        let mut params: Vec<(String, String)> = request.query_params().into_iter().collect();
        params.sort();
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn send_once(&self, url: &Url) -> std::result::Result<Page, ApiError> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(url.clone())
            .query(&[("api_key", self.api_key.expose_secret())])
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e.without_url()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(ErrorClassifier::parse_retry_after);

        let body = response
            .text()
            .await
            .map_err(|e| ErrorClassifier::classify_transport(&e.without_url()))?;

        if status.is_success() {
            return Page::parse(&body);
        }

        let error_body = serde_json::from_str::<Envelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error);

        // OpenFDA reports "no matches" as 404 NOT_FOUND
        if status == StatusCode::NOT_FOUND
            && error_body
                .as_ref()
                .is_some_and(|e| e.code == api::NOT_FOUND_CODE)
        {
            debug!("No matches for query");
            return Ok(Page::empty());
        }

        let message = error_body
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        let mut err = ErrorClassifier::classify_status(status.as_u16(), message);
        if let Some(delay) = retry_after {
            err = err.retry_after(delay);
        }
        Err(err)
    }
}

#[async_trait]
impl FetchSource for OpenFdaClient {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        self.execute(request).await
    }

    fn name(&self) -> &str {
        "openfda"
    }
}

// Response types

/// One decoded page of results
#[derive(Debug)]
struct Page {
    records: Vec<Value>,
    total: Option<u64>,
}

impl Page {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            total: Some(0),
        }
    }

    fn parse(body: &str) -> std::result::Result<Self, ApiError> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| ApiError::decode(format!("Invalid OpenFDA response: {}", e)))?;

        if let Some(error) = envelope.error {
            if error.code == api::NOT_FOUND_CODE {
                return Ok(Self::empty());
            }
            return Err(ApiError::client(format!("{}: {}", error.code, error.message)));
        }

        Ok(Self {
            records: envelope.results,
            total: envelope
                .meta
                .and_then(|m| m.results)
                .and_then(|r| r.total),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    results: Option<MetaResults>,
}

#[derive(Debug, Deserialize)]
struct MetaResults {
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn config_for(server: &MockServer) -> OpenFdaConfig {
        OpenFdaConfig {
            api_key: Some("test-key".to_string()),
            api_base: server.uri(),
            timeout_secs: 5,
            connect_timeout_secs: 5,
            requests_per_minute: 0,
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            min_delay_ms: 1,
            max_delay_ms: 5,
            factor: 2.0,
            jitter: false,
        }
    }

    fn events_body() -> Value {
        json!({
            "meta": {"results": {"skip": 0, "limit": 2, "total": 1234}},
            "results": [
                {"safetyreportid": "1"},
                {"safetyreportid": "2"}
            ]
        })
    }

    #[test]
    fn test_missing_api_key_is_auth_error() {
        let config = OpenFdaConfig::default();
        let err = OpenFdaClient::new(&config, RetryConfig::default()).unwrap_err();
        assert!(matches!(err, LensError::Auth(_)));

        let config = OpenFdaConfig {
            api_key: Some("   ".to_string()),
            ..Default::default()
        };
        let err = OpenFdaClient::new(&config, RetryConfig::default()).unwrap_err();
        assert!(matches!(err, LensError::Auth(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = OpenFdaConfig {
            api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let client = OpenFdaClient::new(&config, RetryConfig::default()).unwrap();
        assert!(!format!("{:?}", client).contains("super-secret"));
    }

    #[tokio::test]
    async fn test_fetch_success_parses_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("search", "receivedate:[20240101 TO 20241231]"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let request = FetchRequest::new(Endpoint::DrugEvent)
            .search("receivedate:[20240101+TO+20241231]")
            .page(2, 0);

        let result = client.fetch(&request).await;
        assert!(result.is_ok(), "unexpected error: {:?}", result.error);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.total, Some(1234));
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "BAD_REQUEST", "message": "Syntax error in search"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(4)).unwrap();
        let result = client
            .fetch(&FetchRequest::new(Endpoint::DrugEvent).search("bad:::"))
            .await;

        let err = result.error.expect("should fail");
        assert_eq!(err.category, ErrorCategory::Client);
        assert_eq!(err.status, Some(400));
        assert_eq!(err.message, "Syntax error in search");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/food/enforcement.json"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/food/enforcement.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let result = client
            .fetch(&FetchRequest::new(Endpoint::FoodEnforcement))
            .await;

        assert!(result.is_ok(), "unexpected error: {:?}", result.error);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.records.len(), 2);
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_ceiling_returns_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .expect(3)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let result = client
            .fetch(&FetchRequest::new(Endpoint::DeviceRecall))
            .await;

        let err = result.error.expect("should fail");
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_server_error_retried_as_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(2)).unwrap();
        let result = client.fetch(&FetchRequest::new(Endpoint::DrugLabel)).await;
        assert!(result.is_ok());
        assert_eq!(result.attempts, 2);
    }

    #[tokio::test]
    async fn test_auth_rejection_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(4)).unwrap();
        let result = client.fetch(&FetchRequest::new(Endpoint::DrugNdc)).await;
        assert_eq!(
            result.error.map(|e| e.category),
            Some(ErrorCategory::Auth)
        );
    }

    #[tokio::test]
    async fn test_not_found_is_empty_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "NOT_FOUND", "message": "No matches found!"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let result = client
            .fetch(&FetchRequest::new(Endpoint::TobaccoProblem).search("nothing"))
            .await;

        assert!(result.is_ok());
        assert!(result.is_empty());
        assert_eq!(result.total, Some(0));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let result = client.fetch(&FetchRequest::new(Endpoint::FoodEvent)).await;
        assert_eq!(
            result.error.map(|e| e.category),
            Some(ErrorCategory::Decode)
        );
    }

    #[tokio::test]
    async fn test_out_of_bounds_page_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(events_body()))
            .expect(0)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new(&config_for(&server), fast_retry(3)).unwrap();
        let result = client
            .fetch_page(Endpoint::DrugEvent, QueryParams::new(), 5000, 0)
            .await;

        assert_eq!(
            result.error.map(|e| e.category),
            Some(ErrorCategory::Client)
        );
        assert_eq!(result.attempts, 0);
    }

    #[tokio::test]
    async fn test_network_failure_retried_then_reported() {
        // Nothing listens on this port
        let config = OpenFdaConfig {
            api_key: Some("test-key".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 2,
            requests_per_minute: 0,
        };
        let client = OpenFdaClient::new(&config, fast_retry(2)).unwrap();
        let result = client.fetch(&FetchRequest::new(Endpoint::DrugEvent)).await;

        let err = result.error.expect("should fail");
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(!err.message.contains("test-key"));
        assert_eq!(result.attempts, 2);
    }
}
