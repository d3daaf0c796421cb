//! Client-side request throttle
//!
//! A governor token bucket shared by every request of one [`HttpClient`],
//! across seeds and collectors, so a run never exceeds the server's budget.
//!
//! [`HttpClient`]: super::HttpClient

use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Request budget of one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub rate: u32,
    /// Requests that may be sent back to back before throttling starts
    pub burst: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::per_second(10)
    }
}

impl RateLimiterConfig {
    pub fn new(rate: u32, burst: u32) -> Self {
        Self { rate, burst }
    }

    /// Steady rate with a burst of one second's worth of requests
    pub fn per_second(rate: u32) -> Self {
        Self::new(rate, rate)
    }

    fn quota(self) -> Quota {
        // A zero budget would stall forever; treat it as one request.
        let at_least_one = |n| NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(at_least_one(self.rate)).allow_burst(at_least_one(self.burst))
    }
}

/// Shared token bucket
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            bucket: Arc::new(governor::RateLimiter::direct(config.quota())),
        }
    }

    /// Wait for the next permit
    pub async fn wait(&self) {
        self.bucket.until_ready().await;
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.bucket.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RateLimiter")
    }
}
