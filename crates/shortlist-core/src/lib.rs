//! Shortlist Core Library
//!
//! Core functionality for the shortlist candidate search engine.
//!
//! # Features
//! - Six-stage retrieval and ranking pipeline over resume collections
//! - Skill-gated hybrid search (lexical term matching + vector cosine)
//! - Reciprocal Rank Fusion (RRF) with deterministic ordering
//! - Bounded per-candidate evidence packs with LLM-written highlights
//! - Cross-encoder reranking with normalized weighted scoring
//! - Streaming progress events (SSE-encodable) with degraded-mode fallbacks

pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod skills;
pub mod state;
pub mod store;
pub mod stream;
pub mod text;

pub use config::{LLMServiceConfig, PipelineConfig};
pub use error::{Error, Result, ShortlistError};
pub use llm::{
    shared_cross_encoder, shared_embedder, ChatMessage, CrossEncoder, Embedder, HighlightWriter,
    HttpCrossEncoder, HttpEmbedder, HttpLLMClient, LLMClient, LlmHighlightWriter, LlmQueryParser,
    QueryParser, RerankDocument, RerankResult,
};
pub use pipeline::{combine_scores, fuse, is_domain_relevant, new_request_id, Pipeline};
pub use search::{cosine_similarity, lexical_search, vector_search};
pub use skills::{normalize_skill, normalize_skills};
pub use state::{
    EvidenceItem, EvidencePack, FusedCandidate, HitSource, MatchQuality, MissionSpec,
    RankedCandidate, RetrievalHit, RunState, ScoreBreakdown, ShortlistResponse, ShortlistResult,
    WhyMatched,
};
pub use store::{ChunkRecord, DocumentStore, ExperienceEntry, ProfileRecord, SkillMatch, SqliteStore};
pub use stream::{Event, EventWriter, EVENT_BUFFER};
