//! Judge trait for schema-constrained model judgments.
//!
//! A judge receives one prompt plus the JSON schema its answer must follow
//! and returns either a conforming value or an explicit refusal. Stages own
//! prompt construction and decoding; judges only move bytes.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::JudgeResult;
pub use crate::types::decision::Stage;

/// One judgment query.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    /// Stage asking the question
    pub stage: Stage,

    /// Sentence the query is about
    pub sentence_index: usize,

    /// Text under judgment (the sentence, or its resolved rewrite)
    pub subject: String,

    /// Stage instructions
    pub system_prompt: String,

    /// Sentence, context and question for this call
    pub user_prompt: String,

    /// Name of the expected response shape
    pub schema_name: &'static str,

    /// JSON schema the answer must conform to
    pub schema: serde_json::Value,
}

/// A judge's answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Judgment {
    /// Structured value, not yet validated against the stage contract
    Value(serde_json::Value),

    /// The judge declined to answer
    Refusal(String),
}

/// Schema-constrained judgment capability.
///
/// Implementations wrap specific LLM providers (OpenAI, etc.) and map
/// provider failures onto [`JudgeError`](crate::error::JudgeError) so the
/// pipeline can tell transient failures from permanent ones.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Answer one query.
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment>;
}

#[async_trait]
impl<J: Judge + ?Sized> Judge for Arc<J> {
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment> {
        (**self).judge(request).await
    }
}

#[async_trait]
impl<J: Judge + ?Sized> Judge for Box<J> {
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment> {
        (**self).judge(request).await
    }
}
