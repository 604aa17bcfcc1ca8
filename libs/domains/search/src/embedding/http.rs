//! Client for a self-hosted embedding endpoint.
//!
//! The endpoint accepts `POST {"text": "..."}` and answers with a bare JSON
//! array of floats (e.g. a sentence-transformers model behind a small HTTP
//! wrapper).

use std::time::Duration;

use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::EmbeddingProvider;
use crate::error::{SearchError, SearchResult};

/// all-MiniLM-L6-v2 output size
pub const DEFAULT_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Expected vector length; `None` disables the check
    pub dimension: Option<usize>,
}

impl EmbeddingConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
            dimension: Some(DEFAULT_DIMENSION),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_dimension(mut self, dimension: Option<usize>) -> Self {
        self.dimension = dimension;
        self
    }
}

impl FromEnv for EmbeddingConfig {
    /// Reads:
    /// - EMBEDDING_URL: defaults to http://localhost:8080/embed
    /// - EMBEDDING_TIMEOUT_SECS: defaults to 30
    /// - EMBEDDING_DIMENSION: defaults to 384, `0` disables the check
    fn from_env() -> Result<Self, ConfigError> {
        let url = env_or_default("EMBEDDING_URL", "http://localhost:8080/embed");
        let timeout_secs = env_parse("EMBEDDING_TIMEOUT_SECS", 30)?;
        let dimension = match env_parse("EMBEDDING_DIMENSION", DEFAULT_DIMENSION)? {
            0 => None,
            dim => Some(dim),
        };

        Ok(Self {
            url,
            timeout_secs,
            dimension,
        })
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080/embed")
    }
}

pub struct HttpEmbeddingProvider {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

impl HttpEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> SearchResult<Self> {
        Self::new(EmbeddingConfig::from_env()?)
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Embedding(format!(
                "Failed to generate embedding ({}): {}",
                status, error_text
            )));
        }

        let values: Vec<f32> = response
            .json()
            .await
            .map_err(|e| SearchError::Embedding(format!("Malformed embedding response: {}", e)))?;

        if let Some(expected) = self.config.dimension {
            if values.len() != expected {
                return Err(SearchError::Embedding(format!(
                    "Expected {} dimensions, got {}",
                    expected,
                    values.len()
                )));
            }
        }

        debug!(dimension = values.len(), "Generated embedding");
        Ok(values)
    }
}
