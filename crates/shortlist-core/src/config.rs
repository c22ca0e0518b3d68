//! Configuration management
//!
//! Every knob is tunable through environment variables, with the defaults
//! the pipeline was calibrated against. Nothing here reads config files.

use serde::{Deserialize, Serialize};

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

/// Tunables for the six-stage shortlist pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum vector-search chunk hits
    pub k_dense: usize,
    /// Maximum lexical-search chunk hits
    pub k_sparse: usize,
    /// Candidate pool cap (skill gate and fusion output)
    pub k_pool: usize,
    /// How many fused candidates get evidence and reranking
    pub k_rerank: usize,
    /// Reciprocal rank fusion constant
    pub rrf_k: f64,
    /// Evidence pack item cap
    pub max_chunks_per_candidate: usize,
    /// Per-chunk snippet character cap
    pub max_chars_per_chunk: usize,
    /// Total evidence character budget per candidate
    pub max_total_chars_per_candidate: usize,
    /// Weight of the normalized RRF signal in the final score
    pub w_rrf: f64,
    /// Weight of the normalized cross-encoder signal in the final score
    pub w_ce: f64,
    /// Minimum final score (percent) to survive hard filtering
    pub min_relevance_score: f64,
    /// Whether hard filters are applied at assembly
    pub hard_filter_enabled: bool,
    /// Maximum results returned to the client
    pub max_results: usize,
    /// How many top candidates get LLM-written highlights
    pub max_llm_highlights: usize,
    /// Concurrent highlight generation calls
    pub highlight_concurrency: usize,
    /// Request-level deadline in seconds
    pub deadline_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k_dense: env_usize("K_DENSE", 300),
            k_sparse: env_usize("K_SPARSE", 300),
            k_pool: env_usize("K_POOL", 500),
            k_rerank: env_usize("K_RERANK", 100),
            rrf_k: env_f64("RRF_K", 60.0),
            max_chunks_per_candidate: env_usize("MAX_CHUNKS_PER_CANDIDATE", 5),
            max_chars_per_chunk: env_usize("MAX_CHARS_PER_CHUNK", 800),
            max_total_chars_per_candidate: env_usize("MAX_TOTAL_CHARS_PER_CANDIDATE", 2500),
            w_rrf: env_f64("W_RRF", 0.35),
            w_ce: env_f64("W_CE", 0.65),
            min_relevance_score: env_f64("MIN_RELEVANCE_SCORE", 20.0),
            hard_filter_enabled: env_bool("HARD_FILTER_ENABLED", true),
            max_results: env_usize("MAX_RESULTS", 25),
            max_llm_highlights: env_usize("MAX_LLM_HIGHLIGHTS", 20),
            highlight_concurrency: env_usize("HIGHLIGHT_CONCURRENCY", 10),
            deadline_secs: env_u64("REQUEST_DEADLINE_SECS", 120),
        }
    }
}

impl PipelineConfig {
    /// Current configuration as JSON, for debugging
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "retrieval": { "k_dense": self.k_dense, "k_sparse": self.k_sparse, "k_pool": self.k_pool },
            "fusion": { "rrf_k": self.rrf_k },
            "evidence": {
                "max_chunks": self.max_chunks_per_candidate,
                "max_chars_chunk": self.max_chars_per_chunk,
                "max_chars_total": self.max_total_chars_per_candidate,
            },
            "rerank": { "k_rerank": self.k_rerank },
            "scoring": { "w_rrf": self.w_rrf, "w_ce": self.w_ce },
            "filtering": {
                "enabled": self.hard_filter_enabled,
                "min_relevance_score": self.min_relevance_score,
                "max_results": self.max_results,
            },
        })
    }
}

/// External inference service configuration
///
/// The chat LLM speaks the OpenAI-compatible `/v1/chat/completions` protocol;
/// the embedder and cross-encoder are the ML sidecar's `/embed` and `/rerank`
/// endpoints. The embedding and rerank URLs fall back to the main URL when
/// not set separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the LLM service for chat/completions
    pub url: String,

    /// Model name for chat completions (query parsing, highlights)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for the embeddings service
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Base URL for the cross-encoder rerank service
    #[serde(default)]
    pub rerank_url: Option<String>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    /// Get the rerank URL (falls back to main URL if not specified)
    pub fn reranker_url(&self) -> &str {
        self.rerank_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("SHORTLIST_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("SHORTLIST_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            rerank_url: std::env::var("SHORTLIST_RERANK_URL").ok(),
            api_key: std::env::var("SHORTLIST_LLM_API_KEY").ok(),
            timeout_secs: env_u64("SHORTLIST_LLM_TIMEOUT_SECS", default_timeout()),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("SHORTLIST_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("SHORTLIST_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    30
}
