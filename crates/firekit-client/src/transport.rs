//! Request execution: auth injection, retry loop, error translation.
//!
//! Every outbound call in the crate funnels through [`Transport::request`]
//! (or [`Transport::request_raw`] for media bodies); no other component
//! performs network I/O. The transport owns:
//! - credential placement (query parameter vs bearer header)
//! - the bounded retry loop with backoff and `Retry-After` handling
//! - translation of raw HTTP/network failures into the error taxonomy

use std::time::{Duration, Instant};

use reqwest::{header, Client, Method, StatusCode};
use tracing::{info_span, warn, Instrument};

use crate::error::{Error, Result};
use crate::metrics::{record_request, record_retry};
use crate::retry::{backoff_delay, RetryConfig};

/// HTTP statuses worth another attempt.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

// =============================================================================
// Configuration
// =============================================================================

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }
}

impl TransportConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let timeout_secs: u64 = std::env::var("FIREKIT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Self {
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::from_env(),
        }
    }
}

// =============================================================================
// Request description
// =============================================================================

/// Where the resolved credential is injected before the call.
///
/// Chosen by the specific operation, not by the caller: the document store
/// wants a bearer header, the JSON tree store an `auth` query parameter, the
/// identity endpoints a `key` parameter.
#[derive(Debug, Clone)]
pub enum CredentialMode {
    QueryParam(&'static str),
    BearerHeader,
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Json(serde_json::Value),
    Raw {
        bytes: Vec<u8>,
        content_type: String,
    },
}

/// One logical HTTP call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Operation label for spans and metrics.
    pub operation: &'static str,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub credential: Option<String>,
    pub credential_mode: CredentialMode,
}

impl ApiRequest {
    pub fn new(operation: &'static str, method: Method, url: impl Into<String>) -> Self {
        Self {
            operation,
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::None,
            credential: None,
            credential_mode: CredentialMode::BearerHeader,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn raw(mut self, bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Raw {
            bytes,
            content_type: content_type.into(),
        };
        self
    }

    pub fn credential(mut self, credential: Option<String>, mode: CredentialMode) -> Self {
        self.credential = credential;
        self.credential_mode = mode;
        self
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Request executor shared by every service surface.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    config: TransportConfig,
}

impl Transport {
    /// Create a new transport.
    pub fn new(config: TransportConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("firekit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::service(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(TransportConfig::from_env())
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.config.retry
    }

    /// Execute a request and parse the response body as JSON.
    ///
    /// An empty 2xx body parses to `Value::Null`.
    pub async fn request(&self, req: ApiRequest) -> Result<serde_json::Value> {
        let bytes = self.request_raw(req).await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| {
            let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(200)]).into_owned();
            Error::service(format!(
                "failed to parse response body: {} (body prefix: {})",
                e, prefix
            ))
        })
    }

    /// Execute a request and return the raw response body.
    pub async fn request_raw(&self, req: ApiRequest) -> Result<Vec<u8>> {
        let span = info_span!(
            "firekit_request",
            operation = %req.operation,
            method = %req.method,
        );

        let start = Instant::now();
        let result = self.run_with_retry(&req).instrument(span).await;

        let status = match &result {
            Ok((status, _)) => *status,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(req.operation, status, start.elapsed().as_secs_f64());

        result.map(|(_, bytes)| bytes)
    }

    /// Bounded retry loop; yields the final status and body. `attempt` counts
    /// retries already performed, so the initial try runs with a full budget
    /// of `max_retries` left.
    async fn run_with_retry(&self, req: &ApiRequest) -> Result<(u16, Vec<u8>)> {
        let retry = &self.config.retry;

        for attempt in 1..=retry.max_retries + 1 {
            let retries_left = attempt <= retry.max_retries;

            let response = match self.build_request(req).send().await {
                Ok(response) => response,
                Err(e) if retries_left && is_transient(&e) => {
                    let delay = backoff_delay(attempt, retry.base_delay);
                    warn!(
                        operation = %req.operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transport failure, retrying: {}",
                        e
                    );
                    record_retry(req.operation);
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    return Err(Error::Network {
                        attempts: attempt,
                        source: e,
                    })
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .bytes()
                    .await
                    .map(|b| (status.as_u16(), b.to_vec()))
                    .map_err(|e| Error::Network {
                        attempts: attempt,
                        source: e,
                    });
            }

            let retry_after = parse_retry_after(&response);
            if RETRYABLE_STATUSES.contains(&status.as_u16()) && retries_left {
                // Prefer the server's hint over computed backoff.
                let delay = match retry_after {
                    Some(secs) => Duration::from_secs(secs),
                    None => backoff_delay(attempt, retry.base_delay),
                };
                warn!(
                    operation = %req.operation,
                    attempt,
                    status = status.as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    "retryable status, retrying"
                );
                record_retry(req.operation);
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(Self::decode_error(status, response, retry_after).await);
        }

        unreachable!("retry loop always returns");
    }

    fn build_request(&self, req: &ApiRequest) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(req.method.clone(), &req.url);

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }

        if let Some(credential) = &req.credential {
            builder = match &req.credential_mode {
                CredentialMode::QueryParam(name) => builder.query(&[(*name, credential.as_str())]),
                CredentialMode::BearerHeader => builder.bearer_auth(credential),
            };
        }

        match &req.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Raw {
                bytes,
                content_type,
            } => builder
                .header(header::CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        }
    }

    async fn decode_error(
        status: StatusCode,
        response: reqwest::Response,
        retry_after: Option<u64>,
    ) -> Error {
        let body = response.text().await.unwrap_or_default();
        Error::from_response(status.as_u16(), &body, retry_after)
    }
}

/// Whether a reqwest failure is worth retrying (connect/timeout trouble, not
/// a malformed request).
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

/// Integer `Retry-After` seconds, when the server sent one.
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

// =============================================================================
// Tests
// =============================================================================
