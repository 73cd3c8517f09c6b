//! Rate-limited judge wrapper.
//!
//! Wraps any Judge implementation with rate limiting using the governor crate.
//! `max_concurrency` bounds calls in flight; this bounds calls per second.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{ClaimifyError, JudgeResult, Result};
use crate::traits::judge::{Judge, JudgeRequest, Judgment};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A judge wrapper that enforces a request rate.
pub struct RateLimitedJudge<J: Judge> {
    inner: J,
    limiter: Arc<DefaultRateLimiter>,
}

impl<J: Judge> RateLimitedJudge<J> {
    /// Allow at most `requests_per_second` judge calls per second.
    pub fn new(judge: J, requests_per_second: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?);
        Ok(Self::with_quota(judge, quota))
    }

    /// Create with a custom quota.
    pub fn with_quota(judge: J, quota: Quota) -> Self {
        Self {
            inner: judge,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Sustained rate with a burst allowance.
    pub fn with_burst(judge: J, requests_per_second: u32, burst: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)
            .allow_burst(non_zero(burst, "burst")?);
        Ok(Self::with_quota(judge, quota))
    }

    /// Get a reference to the wrapped judge.
    pub fn inner(&self) -> &J {
        &self.inner
    }
}

fn non_zero(value: u32, name: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| ClaimifyError::Config(format!("{} must be > 0", name)))
}

#[async_trait]
impl<J: Judge> Judge for RateLimitedJudge<J> {
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment> {
        self.limiter.until_ready().await;
        self.inner.judge(request).await
    }
}

/// Extension trait for easy rate limiting.
pub trait JudgeExt: Judge + Sized {
    /// Wrap this judge with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> Result<RateLimitedJudge<Self>> {
        RateLimitedJudge::new(self, requests_per_second)
    }
}

impl<J: Judge + Sized> JudgeExt for J {}
