//! Stage 6: final assembly
//!
//! Enriches the ranked candidates with profile data, applies the hard
//! relevance filters, classifies overall match quality and builds the
//! external response.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::state::{
    EvidencePack, MatchQuality, RankedCandidate, RunState, ScoreBreakdown, ShortlistResponse,
    ShortlistResult,
};
use crate::store::{DocumentStore, ProfileRecord};
use crate::stream::{Event, EventWriter};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "assembly";
const AGENT: &str = "Assembly";

lazy_static! {
    /// Domain keywords used for hard-filter headline matching
    static ref DOMAIN_KEYWORDS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert(
            "digital marketing",
            vec!["marketing", "seo", "sem", "ppc", "content", "brand", "advertising", "media", "campaign", "crm", "growth"],
        );
        m.insert(
            "python development",
            vec!["python", "django", "flask", "fastapi", "backend"],
        );
        m.insert(
            "data engineering",
            vec!["data engineer", "etl", "pipeline", "spark", "airflow", "warehouse"],
        );
        m.insert(
            "frontend development",
            vec!["frontend", "react", "angular", "vue", "css", "javascript", "typescript", "ui"],
        );
        m.insert(
            "backend development",
            vec!["backend", "api", "server", "microservice", "nodejs", "java", "go"],
        );
        m.insert(
            "machine learning",
            vec!["machine learning", "ml", "deep learning", "ai", "neural", "nlp", "computer vision", "model"],
        );
        m.insert(
            "devops",
            vec!["devops", "ci/cd", "kubernetes", "docker", "terraform", "infrastructure", "sre"],
        );
        m.insert(
            "data science",
            vec!["data scien", "analytics", "statistics", "jupyter", "pandas", "tableau", "visualization"],
        );
        m.insert(
            "product management",
            vec!["product manager", "roadmap", "stakeholder", "agile", "scrum"],
        );
        m.insert(
            "cloud engineering",
            vec!["cloud", "aws", "azure", "gcp", "infrastructure"],
        );
        m.insert(
            "mobile development",
            vec!["mobile", "ios", "android", "swift", "kotlin", "flutter", "react native"],
        );
        m.insert(
            "cybersecurity",
            vec!["security", "penetration", "vulnerability", "compliance", "soc", "firewall"],
        );
        m.insert(
            "qa engineering",
            vec!["qa", "quality assurance", "testing", "automation test", "selenium"],
        );
        m.insert(
            "ui/ux design",
            vec!["design", "ux", "ui", "figma", "sketch", "wireframe", "prototype", "user research"],
        );
        m
    };
}

/// Whether a candidate's headline is relevant to the core domain
///
/// Matches when the domain appears verbatim in the headline, when any
/// lexicon keyword for that domain appears, or, for unknown domains, when
/// any domain word longer than two characters appears.
pub fn is_domain_relevant(headline: &str, core_domain: &str) -> bool {
    if core_domain.is_empty() {
        return true;
    }

    let headline_lower = headline.to_lowercase();
    let domain_lower = core_domain.to_lowercase();

    if headline_lower.contains(&domain_lower) {
        return true;
    }

    match DOMAIN_KEYWORDS.get(domain_lower.as_str()) {
        Some(keywords) => keywords.iter().any(|kw| headline_lower.contains(kw)),
        None => domain_lower
            .split_whitespace()
            .filter(|word| word.chars().count() > 2)
            .any(|word| headline_lower.contains(word)),
    }
}

fn build_result(
    ranked: &RankedCandidate,
    profiles: &HashMap<String, ProfileRecord>,
    packs: &HashMap<String, EvidencePack>,
) -> ShortlistResult {
    let cid = &ranked.candidate_id;
    let pack = packs
        .get(cid)
        .cloned()
        .unwrap_or_else(|| EvidencePack::empty(cid.clone()));
    let profile = profiles.get(cid);

    ShortlistResult {
        candidate_id: cid.clone(),
        name: profile.map(|p| p.name.clone()).unwrap_or_default(),
        final_score: ranked.final_score,
        score_breakdown: ScoreBreakdown {
            rrf_score: ranked.rrf_score,
            rerank_score: ranked.rerank_score,
            dense_rank: ranked.dense_rank,
            sparse_rank: ranked.sparse_rank,
        },
        highlights: pack.highlights.clone(),
        evidence_pack: pack,
        headline: profile
            .map(|p| p.headline.clone())
            .unwrap_or_else(|| "No title available".to_string()),
        total_yoe: profile.map(|p| p.total_yoe).unwrap_or(0),
        location_country: profile.map(|p| p.location_country.clone()).unwrap_or_default(),
        location_city: profile.map(|p| p.location_city.clone()).unwrap_or_default(),
        summary: profile.map(|p| p.summary.clone()).unwrap_or_default(),
        matched_skills: ranked.matched_skills.clone(),
    }
}

pub(crate) async fn run(
    state: &RunState,
    store: &dyn DocumentStore,
    cfg: &PipelineConfig,
    writer: &EventWriter,
) -> Result<(ShortlistResponse, f64)> {
    let start = Instant::now();
    let final_results = &state.final_results;
    let spec = state.mission_spec.clone().unwrap_or_default();
    let core_domain = spec.core_domain.clone().unwrap_or_default();

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 6,
            message: format!(
                "Assembling final shortlist with {} candidates",
                final_results.len()
            ),
        })
        .await?;

    // Profile enrichment for the filtering window
    let candidate_ids: Vec<String> = final_results
        .iter()
        .take(cfg.max_results * 2)
        .map(|r| r.candidate_id.clone())
        .collect();

    writer
        .emit(Event::ToolCall {
            agent: AGENT.into(),
            tool: "fetch_profiles".into(),
            message: format!(
                "Enriching {} candidates with profile data",
                candidate_ids.len()
            ),
        })
        .await?;

    let profiles: HashMap<String, ProfileRecord> = store
        .fetch_profiles(&candidate_ids)
        .await?
        .into_iter()
        .map(|p| (p.candidate_id.clone(), p))
        .collect();

    writer
        .emit(Event::ToolResult {
            agent: AGENT.into(),
            tool: "fetch_profiles".into(),
            message: format!("Loaded {} candidate profiles", profiles.len()),
        })
        .await?;

    // Pass 1: hard filters, in order, short-circuit on reject
    let mut strong_results: Vec<ShortlistResult> = Vec::new();
    let mut score_filtered = 0usize;
    let mut domain_filtered = 0usize;

    for ranked in final_results {
        if cfg.hard_filter_enabled && ranked.final_score < cfg.min_relevance_score {
            score_filtered += 1;
            continue;
        }

        if cfg.hard_filter_enabled && !core_domain.is_empty() {
            let headline = profiles
                .get(&ranked.candidate_id)
                .map(|p| p.headline.as_str())
                .unwrap_or("No title available");
            if !is_domain_relevant(headline, &core_domain) {
                domain_filtered += 1;
                continue;
            }
        }

        strong_results.push(build_result(ranked, &profiles, &state.evidence_packs));
        if strong_results.len() >= cfg.max_results {
            break;
        }
    }

    let filtered = score_filtered + domain_filtered;
    if filtered > 0 {
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: format!(
                    "Filtered out {} candidates ({} below {}% score, {} outside '{}' domain)",
                    filtered,
                    score_filtered,
                    cfg.min_relevance_score as i64,
                    domain_filtered,
                    if core_domain.is_empty() { "none" } else { &core_domain }
                ),
            })
            .await?;
    }

    // Match-quality classification with weak-match fallback
    let mut match_quality = MatchQuality::Strong;
    let mut results = strong_results;

    if results.is_empty() && !final_results.is_empty() {
        match_quality = MatchQuality::Weak;
        let weak_limit = cfg.max_results.min(10);
        results = final_results
            .iter()
            .take(weak_limit)
            .map(|r| build_result(r, &profiles, &state.evidence_packs))
            .collect();

        let best = results
            .iter()
            .map(|r| r.final_score)
            .fold(0.0_f64, f64::max);
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: format!(
                    "No strong matches found (best score: {best:.0}%). Returning top {} as weak matches",
                    results.len()
                ),
            })
            .await?;
    } else if final_results.is_empty() {
        match_quality = MatchQuality::None;
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: "No candidates found in the database matching this query".into(),
            })
            .await?;
    }

    let elapsed = start.elapsed().as_secs_f64();
    let mut stage_timings = state.stage_timings.clone();
    stage_timings.insert(STAGE_NAME.to_string(), elapsed);

    let response = ShortlistResponse {
        request_id: state.request_id.clone(),
        suggested_refinements: spec.clarifications.clone(),
        mission_spec: spec,
        results,
        stage_timings,
        total_candidates_found: final_results.len(),
        match_quality,
    };

    let timing_ms = (elapsed * 1000.0).round() as u64;
    let complete_message = match match_quality {
        MatchQuality::Weak => format!(
            "No strong matches. Showing {} weak matches ({}ms)",
            response.results.len(),
            timing_ms
        ),
        _ => format!(
            "Shortlist assembled: {} candidates returned ({} filtered, {}ms)",
            response.results.len(),
            filtered,
            timing_ms
        ),
    };
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms,
            message: complete_message,
        })
        .await?;

    writer
        .emit(Event::Result {
            data: Box::new(response.clone()),
            message: format!(
                "Pipeline complete. Returning {} {} candidates",
                response.results.len(),
                if match_quality == MatchQuality::Weak {
                    "weak-match"
                } else {
                    "ranked"
                }
            ),
        })
        .await?;

    Ok((response, elapsed))
}
