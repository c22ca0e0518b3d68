//! Persisted-collection access
//!
//! The pipeline consumes three collections produced by the ingestion
//! pipeline: `resume_skills`, `resume_chunks` and `resumes_core`. It sees
//! them only through the [`DocumentStore`] trait; the bundled
//! [`SqliteStore`] is the reference backend.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A candidate matched by the skills index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    pub candidate_id: String,
    pub matched_skills: Vec<String>,
    pub matched_count: usize,
    pub avg_confidence: f64,
}

/// One stored resume chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub candidate_id: String,
    pub section_type: String,
    pub section_ordinal: u32,
    pub chunk_text: String,
    /// Chunk embedding, absent when the chunk was never embedded
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// One experience entry from a stored resume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
}

/// Core profile data for result enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub candidate_id: String,
    pub name: String,
    pub summary: String,
    pub total_yoe: u32,
    pub location_country: String,
    pub location_city: String,
    /// `"{latest_title} at {latest_company}"`, derived from experience
    pub headline: String,
}

/// Derive a display headline from the most recent experience entry
pub fn make_headline(experience: &[ExperienceEntry]) -> String {
    let Some(latest) = experience.first() else {
        return "No title available".to_string();
    };
    match (latest.title.is_empty(), latest.company.is_empty()) {
        (false, false) => format!("{} at {}", latest.title, latest.company),
        (false, true) => latest.title.clone(),
        (true, false) => latest.company.clone(),
        (true, true) => "No title available".to_string(),
    }
}

/// Access to the persisted resume collections
///
/// The handle is shared across requests and must be thread-safe; per-call
/// state stays in the pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Match-any skills gate: candidates holding at least `min_match` of
    /// `skills`, ordered by matched count descending then average
    /// confidence descending, capped at `limit`.
    async fn search_skills(
        &self,
        skills: &[String],
        min_match: usize,
        limit: usize,
    ) -> Result<Vec<SkillMatch>>;

    /// Fetch chunks in natural storage order, optionally restricted to a
    /// candidate set. Embeddings are only materialized when requested.
    async fn fetch_chunks(
        &self,
        candidate_ids: Option<&[String]>,
        with_embeddings: bool,
    ) -> Result<Vec<ChunkRecord>>;

    /// Fetch core profiles for the given candidates
    async fn fetch_profiles(&self, candidate_ids: &[String]) -> Result<Vec<ProfileRecord>>;
}
