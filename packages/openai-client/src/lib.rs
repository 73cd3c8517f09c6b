//! Pure OpenAI REST API client
//!
//! A clean, minimal client for the OpenAI API with no domain-specific logic.
//! Supports chat completions and schema-constrained structured outputs,
//! surfacing model refusals as a distinct reply instead of an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client.chat_completion(ChatRequest {
//!     model: "gpt-4o".into(),
//!     messages: vec![Message::user("Hello!")],
//!     ..Default::default()
//! }).await?;
//! ```
//!
//! # Type-Safe Structured Output
//!
//! ```rust,ignore
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Verdict {
//!     decision: String,
//! }
//!
//! let request = StructuredRequest::new("gpt-4o", system, user, Verdict::openai_schema());
//! match client.structured_output(request).await? {
//!     StructuredReply::Content { json, .. } => { /* parse */ }
//!     StructuredReply::Refusal { reason, .. } => { /* declined */ }
//! }
//! ```

pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use types::*;

use reqwest::{Client, Response};
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        if api_key.trim().is_empty() {
            return Err(OpenAIError::Config("OPENAI_API_KEY is empty".into()));
        }
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages to the chat completion API and get a response.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();
        let response = self.post_chat(&request).await?;

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Parse("No content in OpenAI response".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }

    /// Structured output with JSON schema.
    ///
    /// Uses OpenAI's `json_schema` response format. Returns the raw JSON text
    /// or the model's refusal; decoding into a type is left to the caller.
    pub async fn structured_output(&self, request: StructuredRequest) -> Result<StructuredReply> {
        let start = std::time::Instant::now();
        let response = self.post_chat(&request).await?;

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let usage = chat_response.usage;
        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| OpenAIError::Parse("No choices in OpenAI response".into()))?;

        debug!(
            model = %request.model,
            schema = %request.response_format.json_schema.name,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI structured output"
        );

        if let Some(reason) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Ok(StructuredReply::Refusal { reason, usage });
        }

        match message.content {
            Some(content) => Ok(StructuredReply::Content {
                json: strip_code_blocks(&content).to_string(),
                usage,
            }),
            None => Err(OpenAIError::Parse(
                "Structured output had neither content nor refusal".into(),
            )),
        }
    }

    async fn post_chat<B: serde::Serialize>(&self, body: &B) -> Result<Response> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "OpenAI API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test").with_base_url("https://custom.api.com/v1/");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url(), "https://custom.api.com/v1");
    }
}
