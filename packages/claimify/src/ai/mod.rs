//! Judge implementations for the claim extraction library.
//!
//! This module provides reference implementations of the `Judge` trait and
//! wrappers around them. Users can use these directly or implement their own.

mod rate_limited;

#[cfg(feature = "openai")]
mod openai;

pub use rate_limited::{JudgeExt, RateLimitedJudge};

#[cfg(feature = "openai")]
pub use openai::{supports_structured_output, OpenAIJudge};
