//! Configuration for the claim extraction pipeline.
//!
//! Passed explicitly to [`Claimify`](crate::Claimify) at construction and
//! threaded through every stage; nothing is read from ambient state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClaimifyError, Result};

/// Configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sentences of context before the target (P).
    ///
    /// Default: 5.
    pub preceding: usize,

    /// Sentences of context after the target (F).
    ///
    /// Default: 5.
    pub following: usize,

    /// Maximum sentences in flight at once.
    ///
    /// Bounds concurrent judge calls to respect provider rate limits.
    /// Default: 4.
    pub max_concurrency: usize,

    /// Retry policy applied around every judge call.
    pub retry: RetryPolicy,

    /// Upper bound for a single judge call. A timeout counts as a
    /// transient failure.
    ///
    /// Default: 60s.
    pub call_timeout: Duration,

    /// Drop sentences that are pure formatting (bare bullets, lone
    /// enumerators) during segmentation.
    ///
    /// Default: true.
    pub filter_formatting_artifacts: bool,

    /// Optional question the document answers, given to every stage as
    /// extra context.
    #[serde(default)]
    pub question: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preceding: 5,
            following: 5,
            max_concurrency: 4,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(60),
            filter_formatting_artifacts: true,
            question: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set context window sizes.
    pub fn with_window(mut self, preceding: usize, following: usize) -> Self {
        self.preceding = preceding;
        self.following = following;
        self
    }

    /// Set the concurrency limit.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Keep or drop formatting-only sentences.
    pub fn with_artifact_filter(mut self, enabled: bool) -> Self {
        self.filter_formatting_artifacts = enabled;
        self
    }

    /// Set the question providing extra context.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        let question = question.into();
        self.question = if question.trim().is_empty() {
            None
        } else {
            Some(question)
        };
        self
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(ClaimifyError::Config(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ClaimifyError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(ClaimifyError::Config("call_timeout must be non-zero".into()));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ClaimifyError::Config(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first call.
    ///
    /// Default: 3.
    pub max_attempts: u32,

    /// Delay after the first failed attempt.
    ///
    /// Default: 500ms.
    pub initial_backoff: Duration,

    /// Ceiling for any single delay.
    ///
    /// Default: 8s.
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays.
    ///
    /// Default: 2.0.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set initial and maximum delay.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Delay to wait after `attempts_made` failed attempts, or `None` when
    /// the budget is spent.
    pub fn backoff_for(&self, attempts_made: u32) -> Option<Duration> {
        if attempts_made == 0 || attempts_made >= self.max_attempts {
            return None;
        }
        let exponent = (attempts_made - 1) as i32;
        let delay = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = delay.min(self.max_backoff.as_secs_f64());
        Some(Duration::from_secs_f64(capped.max(0.0)))
    }
}
