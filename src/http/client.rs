//! HTTP client for the collection engine
//!
//! Every request goes through the same pipeline: wait for a rate-limit
//! permit, attach credentials, send, and retry transient failures with
//! backoff. Non-transient statuses are handed back untouched so the decode
//! layer can classify them.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::response::{ApiClient, ApiResponse};
use crate::error::{is_retryable_status, Error, Result};
use crate::types::{BackoffType, QueryParams};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Credentials sent with every request
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: Basic base64(user:pass)`
    Basic { username: String, password: String },
}

impl Credentials {
    /// Value of the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
        }
    }
}

/// How transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Growth of the delay between attempts
    pub backoff: BackoffType,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffType::Exponential,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            BackoffType::Constant => self.initial_delay,
            BackoffType::Linear => self.initial_delay.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => self
                .initial_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        };
        delay.min(self.max_delay)
    }
}

/// Configuration for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Server root every relative request path is joined to
    pub endpoint: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry behavior
    pub retry: RetryPolicy,
    /// Client-side throttle, `None` disables it
    pub rate_limit: Option<RateLimiterConfig>,
    /// Credentials, if any
    pub credentials: Option<Credentials>,
    /// `User-Agent` header
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            rate_limit: Some(RateLimiterConfig::default()),
            credentials: None,
            user_agent: concat!("scm-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Start building a config from the defaults
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Debug, Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Keep the backoff shape, change only the retry count
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn rate_limit(mut self, limit: Option<RateLimiterConfig>) -> Self {
        self.config.rate_limit = limit;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::Bearer(token.into()));
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Outcome of a single attempt
enum Attempt {
    Done(ApiResponse),
    Retry { delay: Duration, reason: String },
}

/// GET-only client with retry, throttling and credentials
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        let limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Whether requests wait for a rate-limit permit
    pub fn is_throttled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Send a GET request, retrying transient failures.
    ///
    /// A retryable status that is still failing once retries run out is
    /// returned as a response, not an error, so the caller classifies it.
    pub async fn send(&self, path: &str, query: &QueryParams) -> Result<ApiResponse> {
        let url = self.resolve(path);
        let retry = self.config.retry;

        for attempt in 0..=retry.max_retries {
            let last = attempt == retry.max_retries;
            match self.attempt(&url, query, attempt, last).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry { delay, reason } => {
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        of = retry.max_retries + 1,
                        ?delay,
                        "{reason}, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // The final attempt never asks for a retry.
        Err(Error::Other(format!("retries exhausted for {url}")))
    }

    async fn attempt(
        &self,
        url: &str,
        query: &QueryParams,
        attempt: u32,
        last: bool,
    ) -> Result<Attempt> {
        if let Some(limiter) = &self.limiter {
            limiter.wait().await;
        }

        let mut request = self.client.get(url);
        if let Some(credentials) = &self.config.credentials {
            request = request.header(AUTHORIZATION, credentials.header_value());
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if (e.is_timeout() || e.is_connect()) && !last => {
                return Ok(Attempt::Retry {
                    delay: self.config.retry.delay_for(attempt),
                    reason: format!("transport error: {e}"),
                });
            }
            Err(e) if e.is_timeout() => {
                return Err(Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                });
            }
            Err(e) => return Err(Error::Http(e)),
        };

        let status = response.status().as_u16();
        if is_retryable_status(status) && !last {
            let delay = retry_after(response.headers())
                .map_or_else(|| self.config.retry.delay_for(attempt), |d| {
                    d.min(self.config.retry.max_delay)
                });
            return Ok(Attempt::Retry {
                delay,
                reason: format!("HTTP {status}"),
            });
        }

        let final_url = response.url().to_string();
        let body = response.bytes().await?;
        debug!(status, url = %final_url, bytes = body.len(), "response received");
        Ok(Attempt::Done(ApiResponse::new(status, final_url, body)))
    }

    /// Join a relative request path onto the endpoint
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.config.endpoint {
            Some(endpoint) => format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, path: &str, query: &QueryParams) -> Result<ApiResponse> {
        self.send(path, query).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("throttled", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Delay requested by a `Retry-After` header given in seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
