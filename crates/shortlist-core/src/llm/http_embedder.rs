//! HTTP-based embedder using the external embedding service
//!
//! Speaks the ML sidecar's protocol: `POST {url}/embed` with
//! `{"texts": [...]}`, answered by `{"embeddings": [[f32, ...], ...]}`.

use super::Embedder;
use crate::config::LLMServiceConfig;
use crate::error::{Result, ShortlistError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedder backed by the external embedding service
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ShortlistError::Http)?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(LLMServiceConfig::default())
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    texts: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| ShortlistError::Llm("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embed", self.config.embeddings_url());
        let request = EmbedRequest {
            texts: texts.to_vec(),
        };

        let mut req = self.http_client.post(&url).json(&request);
        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShortlistError::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;

        if embed_response.embeddings.len() != texts.len() {
            return Err(ShortlistError::Schema(format!(
                "embedding service returned {} vectors for {} texts",
                embed_response.embeddings.len(),
                texts.len()
            )));
        }

        Ok(embed_response.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.config.embedding_model
    }
}
