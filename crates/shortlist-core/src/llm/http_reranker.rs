//! HTTP-based cross-encoder using the external rerank service
//!
//! Speaks the ML sidecar's protocol: `POST {url}/rerank` with
//! `{"query": ..., "documents": [...], "top_k": N}`, answered by
//! `{"results": [{"index": i, "score": s}, ...]}`. Scores are mapped back
//! to document ids through the submitted order.

use super::{CrossEncoder, RerankDocument, RerankResult};
use crate::config::LLMServiceConfig;
use crate::error::{Result, ShortlistError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cross-encoder backed by the external rerank service
pub struct HttpCrossEncoder {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
}

impl HttpCrossEncoder {
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
struct RerankRequest {
    query: String,
    documents: Vec<String>,
    top_k: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    score: f64,
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/rerank", self.config.reranker_url());
        let request = RerankRequest {
            query: query.to_string(),
            documents: documents.iter().map(|d| d.text.clone()).collect(),
            top_k: documents.len(),
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
                "Rerank service error (HTTP {}): {}",
                status, body
            )));
        }

        let rerank_response: RerankResponse = response.json().await?;

        let mut results = Vec::with_capacity(rerank_response.results.len());
        for entry in rerank_response.results {
            let Some(doc) = documents.get(entry.index) else {
                return Err(ShortlistError::Schema(format!(
                    "rerank service returned out-of-range index {}",
                    entry.index
                )));
            };
            results.push(RerankResult {
                id: doc.id.clone(),
                score: entry.score,
            });
        }

        Ok(results)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
