//! Model integration
//!
//! Provides traits and implementations for:
//! - Embedding generation
//! - Cross-encoder reranking
//! - LLM query parsing
//! - LLM highlight synthesis

mod client;
mod highlights;
mod http_embedder;
mod http_reranker;
mod query_parser;
mod traits;

pub use client::{extract_json, ChatMessage, HttpLLMClient, LLMClient};
pub use highlights::{LlmHighlightWriter, MAX_HIGHLIGHTS};
pub use http_embedder::HttpEmbedder;
pub use http_reranker::HttpCrossEncoder;
pub use query_parser::LlmQueryParser;
pub use traits::*;

use crate::error::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SHARED_EMBEDDER: OnceCell<Arc<HttpEmbedder>> = OnceCell::const_new();
static SHARED_CROSS_ENCODER: OnceCell<Arc<HttpCrossEncoder>> = OnceCell::const_new();

/// Process-wide embedder handle, lazily initialized from the environment
///
/// Concurrent first use is guarded; the handle is built at most once.
pub async fn shared_embedder() -> Result<Arc<dyn Embedder>> {
    let embedder = SHARED_EMBEDDER
        .get_or_try_init(|| async { HttpEmbedder::from_env().map(Arc::new) })
        .await?;
    Ok(embedder.clone())
}

/// Process-wide cross-encoder handle, lazily initialized from the environment
pub async fn shared_cross_encoder() -> Result<Arc<dyn CrossEncoder>> {
    let cross_encoder = SHARED_CROSS_ENCODER
        .get_or_try_init(|| async { HttpCrossEncoder::from_env().map(Arc::new) })
        .await?;
    Ok(cross_encoder.clone())
}
