//! Shared run state and wire types for the shortlist pipeline
//!
//! One `RunState` is created per request and flows through the six stages
//! in order. Each stage reads the fields its predecessors wrote and the
//! pipeline applies its outputs before the next stage starts; nothing here
//! is shared across requests.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Structured output of the query understanding stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionSpec {
    /// Required skills/qualifications, canonical form
    #[serde(default)]
    pub must_have: Vec<String>,
    /// Preferred skills, canonical form
    #[serde(default)]
    pub nice_to_have: Vec<String>,
    /// Skills/domains whose presence disqualifies
    #[serde(default)]
    pub negative_constraints: Vec<String>,
    /// Minimum years of experience
    #[serde(default)]
    pub min_years: Option<u32>,
    /// Preferred location
    #[serde(default)]
    pub location: Option<String>,
    /// Domain tag used for hard filtering (e.g. "digital marketing")
    #[serde(default)]
    pub core_domain: Option<String>,
    /// Missing-info suggestions surfaced back to the recruiter
    #[serde(default)]
    pub clarifications: Vec<String>,
    /// Original query text, preserved verbatim
    #[serde(default)]
    pub raw_query: String,
}

impl MissionSpec {
    /// Spec for an empty query
    pub fn empty() -> Self {
        Self::default()
    }

    /// must_have followed by nice_to_have, order preserved, deduplicated
    pub fn skill_union(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.must_have
            .iter()
            .chain(self.nice_to_have.iter())
            .filter(|s| seen.insert((*s).clone()))
            .cloned()
            .collect()
    }
}

/// Which sub-search produced a retrieval hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    Lexical,
    Vector,
}

/// A single chunk-level search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk_id: String,
    pub candidate_id: String,
    pub section_type: String,
    /// Chunk text, truncated to the per-chunk character cap
    pub chunk_text: String,
    /// Raw score from the search backend
    pub score: f64,
    /// 1-based position in the backend's result list
    pub rank: usize,
    pub source: HitSource,
    /// Skills that gated this candidate (lexical hits only)
    #[serde(default)]
    pub matched_skills: Vec<String>,
}

/// Resume-level candidate after reciprocal rank fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub candidate_id: String,
    pub rrf_score: f64,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    pub matched_count: usize,
}

/// Why an evidence snippet was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhyMatched {
    Lexical,
    Vector,
    Both,
}

/// Single piece of evidence for a candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub chunk_id: String,
    pub section: String,
    pub text_snippet: String,
    pub why_matched: WhyMatched,
}

/// Bounded evidence pack for a candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePack {
    pub candidate_id: String,
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    /// Up to three short lines for the result card
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl EvidencePack {
    /// Empty pack for a candidate with no retrieved chunks
    pub fn empty(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            evidence: Vec::new(),
            highlights: Vec::new(),
        }
    }
}

/// Per-candidate output of the ranking stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    /// Weighted combination of RRF and cross-encoder signals, 0-100
    pub final_score: f64,
    pub rrf_score: f64,
    pub rerank_score: f64,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    pub matched_count: usize,
}

/// Score breakdown for transparency
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub rrf_score: f64,
    pub rerank_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dense_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_rank: Option<usize>,
}

/// Final result for a single candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistResult {
    pub candidate_id: String,
    pub name: String,
    pub final_score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub evidence_pack: EvidencePack,
    pub highlights: Vec<String>,
    pub headline: String,
    pub total_yoe: u32,
    pub location_country: String,
    pub location_city: String,
    pub summary: String,
    pub matched_skills: Vec<String>,
}

/// Overall quality of the returned shortlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    /// At least one candidate survived the hard filters
    Strong,
    /// Nothing survived filtering; top pre-filter candidates returned
    Weak,
    /// Retrieval found nothing at all
    None,
}

/// Full response from the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistResponse {
    pub request_id: String,
    pub mission_spec: MissionSpec,
    pub results: Vec<ShortlistResult>,
    pub suggested_refinements: Vec<String>,
    /// Per-stage wall time in seconds
    pub stage_timings: BTreeMap<String, f64>,
    pub total_candidates_found: usize,
    pub match_quality: MatchQuality,
}

/// Mutable per-request state flowing through the stages
///
/// Fields are written monotonically, one stage at a time, in declared
/// order; the state is discarded once the response is emitted.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub request_id: String,
    pub query_text: String,
    pub mission_spec: Option<MissionSpec>,
    pub sparse_results: Vec<RetrievalHit>,
    pub dense_results: Vec<RetrievalHit>,
    pub fused_candidates: Vec<FusedCandidate>,
    pub evidence_packs: HashMap<String, EvidencePack>,
    pub rerank_scores: HashMap<String, f64>,
    pub final_results: Vec<RankedCandidate>,
    pub stage_timings: BTreeMap<String, f64>,
}

impl RunState {
    pub fn new(request_id: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            query_text: query_text.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_union_dedup() {
        let spec = MissionSpec {
            must_have: vec!["python".into(), "django".into()],
            nice_to_have: vec!["django".into(), "aws".into()],
            ..Default::default()
        };
        assert_eq!(spec.skill_union(), vec!["python", "django", "aws"]);
    }

    #[test]
    fn test_mission_spec_unknown_fields_dropped() {
        let json = r#"{"must_have": ["python"], "weights": {"x": 1.0}, "bogus": 3}"#;
        let spec: MissionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.must_have, vec!["python"]);
        assert!(spec.nice_to_have.is_empty());
    }

    #[test]
    fn test_why_matched_wire_values() {
        assert_eq!(
            serde_json::to_string(&WhyMatched::Both).unwrap(),
            "\"both\""
        );
        assert_eq!(
            serde_json::to_string(&HitSource::Lexical).unwrap(),
            "\"lexical\""
        );
        assert_eq!(
            serde_json::to_string(&MatchQuality::None).unwrap(),
            "\"none\""
        );
    }

    #[test]
    fn test_score_breakdown_omits_null_ranks() {
        let b = ScoreBreakdown {
            rrf_score: 0.1,
            rerank_score: 0.5,
            dense_rank: None,
            sparse_rank: Some(3),
        };
        let json = serde_json::to_string(&b).unwrap();
        assert!(!json.contains("dense_rank"));
        assert!(json.contains("\"sparse_rank\":3"));
    }
}
