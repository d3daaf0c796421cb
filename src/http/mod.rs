//! HTTP client module
//!
//! Provides the request seam of the collector engine ([`ApiClient`]) and its
//! production implementation ([`HttpClient`]).
//!
//! # Features
//!
//! - **Automatic Retries**: 429, 5xx, timeouts and connection errors
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Credentials**: Bearer token or basic auth on every request

mod client;
mod rate_limit;
mod response;

pub use client::{Credentials, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RetryPolicy};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use response::{ApiClient, ApiResponse};
