//! Configuration for collection runs
//!
//! A run is configured by one YAML file naming the connection, the
//! repository scope, HTTP behavior, sync policy and local storage.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig, RetryPolicy};
use crate::state::SyncPolicy;
use crate::types::{BackoffType, CollectionParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete collector configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Remote API connection
    pub connection: ConnectionConfig,

    /// Repository to collect
    pub scope: ScopeConfig,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Full or incremental behavior
    #[serde(default)]
    pub sync: SyncPolicy,

    /// Local storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    100
}

impl CollectorConfig {
    /// Parse a config from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.connection.endpoint.is_empty() {
            return Err(Error::missing_field("connection.endpoint"));
        }
        let endpoint = Url::parse(&self.connection.endpoint)
            .map_err(|e| Error::invalid_value("connection.endpoint", e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "connection.endpoint",
                "must be an http or https URL",
            ));
        }
        if self.scope.full_name.is_empty() {
            return Err(Error::missing_field("scope.full_name"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }
        if self.connection.username.is_some() != self.connection.password.is_some() {
            return Err(Error::invalid_value(
                "connection",
                "username and password must be set together",
            ));
        }
        Ok(())
    }

    /// Scope of every collector run
    pub fn params(&self) -> CollectionParams {
        CollectionParams::new(self.connection.id, &self.scope.full_name)
    }

    /// HTTP client configuration. A `token` overrides configured credentials.
    pub fn http_client_config(&self, token: Option<&str>) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .endpoint(&self.connection.endpoint)
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .retry(RetryPolicy {
                max_retries: self.http.max_retries,
                backoff: self.http.backoff,
                initial_delay: Duration::from_millis(self.http.initial_backoff_ms),
                max_delay: Duration::from_secs(self.http.max_backoff_seconds),
            })
            .rate_limit(self.http.requests_per_second.map(RateLimiterConfig::per_second));

        let token = token.or(self.connection.token.as_deref());
        if let Some(token) = token {
            builder = builder.bearer_token(token);
        } else if let (Some(user), Some(pass)) =
            (&self.connection.username, &self.connection.password)
        {
            builder = builder.basic_auth(user, pass);
        }

        builder.build()
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Remote API connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Connection identifier, tagged on every raw row
    #[serde(default)]
    pub id: u64,

    /// Base URL of the server
    #[serde(default)]
    pub endpoint: String,

    /// Personal access token
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Basic auth username
    #[serde(default)]
    pub username: Option<String>,

    /// Basic auth password
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

/// Repository scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Repository full name, e.g. `PROJ/repos/app`
    #[serde(default)]
    pub full_name: String,
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff strategy between retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// First backoff delay in milliseconds
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: u64,

    /// Request rate limit, unlimited when absent
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: Option<u32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_seconds: default_max_backoff(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    60
}

#[allow(clippy::unnecessary_wraps)]
fn default_requests_per_second() -> Option<u32> {
    Some(10)
}

/// Local storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// DuckDB database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Keep collector state in this JSON file instead of the database
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            state_file: None,
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("scm-ingest.duckdb")
}
