//! Shared fixtures: seeded store and deterministic model backends

#![allow(dead_code)]

use async_trait::async_trait;
use shortlist_core::{
    ChatMessage, ChunkRecord, CrossEncoder, Embedder, ExperienceEntry, HighlightWriter, LLMClient,
    MissionSpec, QueryParser, RerankDocument, RerankResult, Result, ShortlistError, SqliteStore,
};

/// Embedder that returns a fixed unit vector for every text
pub struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn model_name(&self) -> &str {
        "fixed-embedder"
    }
}

/// Embedder whose every call fails (vector path outage)
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(ShortlistError::ExternalError(
            "embedding service unreachable".into(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(ShortlistError::ExternalError(
            "embedding service unreachable".into(),
        ))
    }

    fn model_name(&self) -> &str {
        "failing-embedder"
    }
}

/// Cross-encoder scoring each document by its "python" mention count
pub struct TermCountCrossEncoder;

#[async_trait]
impl CrossEncoder for TermCountCrossEncoder {
    async fn rerank(&self, _query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        Ok(documents
            .iter()
            .map(|doc| RerankResult {
                id: doc.id.clone(),
                score: doc.text.to_lowercase().matches("python").count() as f64,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "term-count-cross-encoder"
    }
}

/// Cross-encoder returning zero for every document
pub struct ZeroCrossEncoder;

#[async_trait]
impl CrossEncoder for ZeroCrossEncoder {
    async fn rerank(&self, _query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        Ok(documents
            .iter()
            .map(|doc| RerankResult {
                id: doc.id.clone(),
                score: 0.0,
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "zero-cross-encoder"
    }
}

/// Cross-encoder whose every call fails
pub struct FailingCrossEncoder;

#[async_trait]
impl CrossEncoder for FailingCrossEncoder {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[RerankDocument],
    ) -> Result<Vec<RerankResult>> {
        Err(ShortlistError::ExternalError(
            "rerank service unreachable".into(),
        ))
    }

    fn model_name(&self) -> &str {
        "failing-cross-encoder"
    }
}

/// Query parser that always returns the same spec
pub struct StubQueryParser {
    pub spec: MissionSpec,
}

#[async_trait]
impl QueryParser for StubQueryParser {
    async fn parse_query(&self, query: &str) -> Result<MissionSpec> {
        let mut spec = self.spec.clone();
        spec.raw_query = query.to_string();
        Ok(spec)
    }
}

/// Chat client replaying a canned response (drives the real parsers)
pub struct CannedChatClient {
    pub response: String,
}

#[async_trait]
impl LLMClient for CannedChatClient {
    async fn chat_completion(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "canned-chat"
    }
}

/// Highlight writer returning three fixed lines
pub struct StubHighlightWriter;

#[async_trait]
impl HighlightWriter for StubHighlightWriter {
    async fn generate_highlights(
        &self,
        _must_have: &[String],
        _nice_to_have: &[String],
        _evidence_text: &str,
    ) -> Result<Vec<String>> {
        Ok(vec![
            "Hands-on experience with the required stack".into(),
            "Shipped production systems in the target domain".into(),
            "Multiple years in closely related roles".into(),
        ])
    }
}

/// Highlight writer whose every call fails
pub struct FailingHighlightWriter;

#[async_trait]
impl HighlightWriter for FailingHighlightWriter {
    async fn generate_highlights(
        &self,
        _must_have: &[String],
        _nice_to_have: &[String],
        _evidence_text: &str,
    ) -> Result<Vec<String>> {
        Err(ShortlistError::Llm("highlight model unavailable".into()))
    }
}

/// Two python candidates: c2 carries the stronger skill set and denser
/// python evidence
pub fn seed_python_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();

    store.insert_skill("c1", "python", 0.90).unwrap();
    store.insert_skill("c2", "python", 0.95).unwrap();
    store.insert_skill("c2", "django", 0.88).unwrap();

    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "c1-exp-0".into(),
            candidate_id: "c1".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "Python developer maintaining internal tools".into(),
            embedding: Some(vec![0.9, 0.1]),
        })
        .unwrap();
    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "c2-exp-0".into(),
            candidate_id: "c2".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "Senior Python engineer, Python services with Django and Python tooling"
                .into(),
            embedding: Some(vec![1.0, 0.0]),
        })
        .unwrap();

    store
        .insert_profile(
            "c1",
            "Alex Doe",
            "Backend developer",
            4,
            "DE",
            "Berlin",
            &[ExperienceEntry {
                title: "Backend Developer".into(),
                company: "Initech".into(),
            }],
        )
        .unwrap();
    store
        .insert_profile(
            "c2",
            "Sam Lee",
            "Senior python engineer",
            7,
            "NL",
            "Amsterdam",
            &[ExperienceEntry {
                title: "Senior Python Engineer".into(),
                company: "Acme".into(),
            }],
        )
        .unwrap();

    store
}

/// Marketing-domain store: a backend engineer with strong lexical signal
/// and an SEO specialist
pub fn seed_marketing_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();

    store.insert_skill("backend", "marketing", 0.9).unwrap();
    store.insert_skill("seo", "marketing", 0.8).unwrap();

    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "backend-0".into(),
            candidate_id: "backend".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "Built marketing analytics backends; marketing data pipelines".into(),
            embedding: Some(vec![1.0, 0.0]),
        })
        .unwrap();
    store
        .insert_chunk(&ChunkRecord {
            chunk_id: "seo-0".into(),
            candidate_id: "seo".into(),
            section_type: "experience".into(),
            section_ordinal: 0,
            chunk_text: "Led digital marketing campaigns and SEO strategy".into(),
            embedding: Some(vec![0.9, 0.1]),
        })
        .unwrap();

    store
        .insert_profile(
            "backend",
            "Bo Chen",
            "Engineer",
            8,
            "US",
            "Austin",
            &[ExperienceEntry {
                title: "Backend Engineer".into(),
                company: "Acme".into(),
            }],
        )
        .unwrap();
    store
        .insert_profile(
            "seo",
            "Dana Ray",
            "Marketer",
            6,
            "UK",
            "London",
            &[ExperienceEntry {
                title: "SEO Specialist".into(),
                company: "Bright".into(),
            }],
        )
        .unwrap();

    store
}
