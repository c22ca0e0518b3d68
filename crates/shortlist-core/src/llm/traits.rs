//! Model trait definitions
//!
//! Every model the pipeline consumes sits behind one of these traits so
//! the LLM-backed strategies stay replaceable (and testable without
//! network access).

use crate::error::Result;
use crate::state::MissionSpec;
use async_trait::async_trait;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Document for reranking
#[derive(Debug, Clone)]
pub struct RerankDocument {
    pub id: String,
    pub text: String,
}

/// Reranking result
#[derive(Debug, Clone)]
pub struct RerankResult {
    pub id: String,
    pub score: f64,
}

/// Cross-encoder relevance scoring trait
///
/// Scores each (query, document) pair jointly, producing one scalar per
/// document.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score documents for a query
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Free-text query to structured requirements
#[async_trait]
pub trait QueryParser: Send + Sync {
    /// Parse a recruiter query into a mission spec
    async fn parse_query(&self, query: &str) -> Result<MissionSpec>;
}

/// Evidence snippets to short per-candidate highlight lines
#[async_trait]
pub trait HighlightWriter: Send + Sync {
    /// Generate up to three highlight lines explaining why the evidence
    /// matches the requirements
    async fn generate_highlights(
        &self,
        must_have: &[String],
        nice_to_have: &[String],
        evidence_text: &str,
    ) -> Result<Vec<String>>;
}
