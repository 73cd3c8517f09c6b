use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Default model; must support structured outputs.
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub model: String,
    pub openai_base_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let openai_api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY must be set (environment or .env file)")?;

        Ok(Self {
            openai_api_key,
            model: env::var("LLM_MODEL")
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }

    /// Build an API client from this configuration.
    pub fn client(&self) -> openai_client::OpenAIClient {
        let client = openai_client::OpenAIClient::new(&self.openai_api_key);
        match &self.openai_base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }
}
