//! OpenAI implementation of the Judge trait.
//!
//! A reference implementation using OpenAI structured outputs. Stage schemas
//! are rewritten into strict mode before sending; the model's refusal field
//! becomes [`Judgment::Refusal`].
//!
//! # Example
//!
//! ```rust,ignore
//! use claimify::ai::OpenAIJudge;
//! use claimify::Claimify;
//!
//! let judge = OpenAIJudge::from_env("gpt-4o-2024-08-06")?;
//! let pipeline = Claimify::new(judge);
//! ```

use async_trait::async_trait;
use openai_client::schema::strict_schema;
use openai_client::{OpenAIClient, OpenAIError, StructuredReply, StructuredRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{JudgeError, JudgeResult};
use crate::traits::judge::{Judge, JudgeRequest, Judgment};

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

/// Completion token cap per call.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Whether `model` accepts `json_schema` response formats.
pub fn supports_structured_output(model: &str) -> bool {
    model == "gpt-4o" || model.starts_with("gpt-4o-mini") || model.starts_with("gpt-4o-2024-")
}

/// OpenAI-backed judge.
///
/// Runs at temperature 0 and counts the calls it makes.
pub struct OpenAIJudge {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    calls: AtomicUsize,
}

impl OpenAIJudge {
    /// Create a judge for `model`. Fails for models without structured
    /// output support.
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> JudgeResult<Self> {
        let model = model.into();
        if !supports_structured_output(&model) {
            return Err(JudgeError::Config(format!(
                "model {} does not support structured outputs; use gpt-4o-mini, gpt-4o-2024-08-06 or later",
                model
            )));
        }

        Ok(Self {
            client,
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            calls: AtomicUsize::new(0),
        })
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> JudgeResult<Self> {
        let client = OpenAIClient::from_env().map_err(|e| JudgeError::Config(e.to_string()))?;
        Self::new(client, model)
    }

    /// Set the completion token cap (default: 2048).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of judge calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Get the underlying client.
    pub fn client(&self) -> &OpenAIClient {
        &self.client
    }
}

#[async_trait]
impl Judge for OpenAIJudge {
    async fn judge(&self, request: &JudgeRequest) -> JudgeResult<Judgment> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        let start = Instant::now();

        let structured = StructuredRequest::new(
            &self.model,
            &request.system_prompt,
            &request.user_prompt,
            strict_schema(request.schema.clone()),
        )
        .schema_name(request.schema_name)
        .max_tokens(self.max_tokens)
        .temperature(0.0);

        debug!(
            call,
            stage = %request.stage,
            sentence_index = request.sentence_index,
            model = %self.model,
            system_chars = request.system_prompt.len(),
            user_chars = request.user_prompt.len(),
            "Sending judge request"
        );

        let reply = self.client.structured_output(structured).await.map_err(|e| {
            warn!(
                call,
                stage = %request.stage,
                sentence_index = request.sentence_index,
                error = %e,
                "Judge request failed"
            );
            map_error(e)
        })?;

        let usage = reply.usage();
        debug!(
            call,
            stage = %request.stage,
            sentence_index = request.sentence_index,
            duration_ms = start.elapsed().as_millis() as u64,
            prompt_tokens = usage.map(|u| u.prompt_tokens),
            completion_tokens = usage.map(|u| u.completion_tokens),
            total_tokens = usage.map(|u| u.total_tokens),
            "Judge response received"
        );

        match reply {
            StructuredReply::Refusal { reason, .. } => Ok(Judgment::Refusal(reason)),
            StructuredReply::Content { json, .. } => serde_json::from_str(&json)
                .map(Judgment::Value)
                .map_err(|e| JudgeError::Malformed(format!("reply is not JSON: {}", e))),
        }
    }
}

fn map_error(error: OpenAIError) -> JudgeError {
    if error.is_transient() {
        return JudgeError::Transient(error.to_string());
    }
    match error {
        OpenAIError::Config(message) => JudgeError::Config(message),
        OpenAIError::Parse(message) => JudgeError::Malformed(message),
        other => JudgeError::Api(other.to_string()),
    }
}
