//! Response type and the request trait the engine depends on

use crate::error::Result;
use crate::types::QueryParams;
use async_trait::async_trait;
use bytes::Bytes;

/// A fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Status code
    pub status: u16,
    /// Final request URL, including the query string
    pub url: String,
    /// Raw body
    pub body: Bytes,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url: url.into(),
            body: body.into(),
        }
    }

    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy for invalid UTF-8
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues GET requests against the remote API.
///
/// Implementations own retries, rate limiting and credentials. Any response
/// that arrives is returned as-is, whatever its status; only transport
/// failures are errors.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET `path` (relative to the endpoint, may carry its own query string)
    /// with the extra query parameters appended.
    async fn get(&self, path: &str, query: &QueryParams) -> Result<ApiResponse>;
}
