//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, request timeouts, conflicts, rate limits and
    /// server-side errors are transient. Everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            OpenAIError::Network(_) => true,
            OpenAIError::Api { status, .. } => {
                matches!(*status, 408 | 409 | 429) || *status >= 500
            }
            OpenAIError::Config(_) | OpenAIError::Parse(_) => false,
        }
    }
}
