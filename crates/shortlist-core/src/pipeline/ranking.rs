//! Stage 5: cross-encoder reranking and final scoring
//!
//! Scores each top candidate's evidence against the query with the
//! cross-encoder, then combines normalized RRF and cross-encoder signals
//! into a 0-100 final score. Cross-encoder failure zeroes that signal and
//! the pipeline continues on RRF alone.

use super::combined_query_text;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::llm::{CrossEncoder, RerankDocument};
use crate::state::{EvidencePack, FusedCandidate, MissionSpec, RankedCandidate};
use crate::stream::{Event, EventWriter};
use crate::text::truncate_chars;
use std::collections::HashMap;
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "ranking";
const AGENT: &str = "Ranker";

/// Reranker backends cap input length
const MAX_RERANK_DOC_CHARS: usize = 512;

/// Guard against a degenerate cross-encoder score range
const CE_RANGE_EPSILON: f64 = 1e-9;

/// Combine RRF and cross-encoder signals into final 0-100 scores
///
/// RRF scores normalize against the batch maximum; cross-encoder scores
/// min-max normalize over the non-zero values, clamped to [0, 1]. When
/// every cross-encoder score is zero that signal contributes nothing.
/// Output is sorted by final score descending, ties broken by RRF score
/// descending then candidate id ascending.
pub fn combine_scores(
    candidates: &[FusedCandidate],
    rerank_scores: &HashMap<String, f64>,
    w_rrf: f64,
    w_ce: f64,
) -> Vec<RankedCandidate> {
    let rrf_max = candidates
        .iter()
        .map(|c| c.rrf_score)
        .fold(0.0_f64, f64::max);

    let nonzero: Vec<f64> = rerank_scores
        .values()
        .copied()
        .filter(|v| *v != 0.0)
        .collect();
    let ce_min = nonzero.iter().copied().fold(f64::INFINITY, f64::min);
    let ce_max = nonzero.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ce_range = (ce_max - ce_min).max(CE_RANGE_EPSILON);

    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| {
            let rrf_norm = if rrf_max > 0.0 {
                candidate.rrf_score / rrf_max
            } else {
                0.0
            };

            let ce_raw = rerank_scores
                .get(&candidate.candidate_id)
                .copied()
                .unwrap_or(0.0);
            let ce_norm = if nonzero.is_empty() {
                0.0
            } else {
                ((ce_raw - ce_min) / ce_range).clamp(0.0, 1.0)
            };

            let final_score = 100.0 * (w_rrf * rrf_norm + w_ce * ce_norm);
            let final_score = (final_score * 10.0).round() / 10.0;

            RankedCandidate {
                candidate_id: candidate.candidate_id.clone(),
                final_score,
                rrf_score: candidate.rrf_score,
                rerank_score: ce_raw,
                dense_rank: candidate.dense_rank,
                sparse_rank: candidate.sparse_rank,
                matched_skills: candidate.matched_skills.clone(),
                matched_count: candidate.matched_count,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.rrf_score
                    .partial_cmp(&a.rrf_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });

    ranked
}

/// Evidence snippets joined for the reranker, with a skills fallback
fn rerank_document(candidate: &FusedCandidate, pack: Option<&EvidencePack>) -> String {
    let text = pack
        .map(|p| {
            p.evidence
                .iter()
                .map(|e| e.text_snippet.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .unwrap_or_default();
    let text = if text.is_empty() {
        format!("Skills: {}", candidate.matched_skills.join(", "))
    } else {
        text
    };
    truncate_chars(&text, MAX_RERANK_DOC_CHARS)
}

pub(crate) async fn run(
    fused: &[FusedCandidate],
    packs: &HashMap<String, EvidencePack>,
    spec: &MissionSpec,
    cross_encoder: &dyn CrossEncoder,
    cfg: &PipelineConfig,
    writer: &EventWriter,
) -> Result<(HashMap<String, f64>, Vec<RankedCandidate>, f64)> {
    let start = Instant::now();

    let top_candidates = &fused[..fused.len().min(cfg.k_rerank)];

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 5,
            message: format!(
                "Reranking top {} candidates with the cross-encoder",
                top_candidates.len()
            ),
        })
        .await?;

    let query_text = combined_query_text(spec);

    let documents: Vec<RerankDocument> = top_candidates
        .iter()
        .map(|candidate| RerankDocument {
            id: candidate.candidate_id.clone(),
            text: rerank_document(candidate, packs.get(&candidate.candidate_id)),
        })
        .collect();

    let mut rerank_scores: HashMap<String, f64> = HashMap::new();
    if !documents.is_empty() {
        writer
            .emit(Event::ToolCall {
                agent: AGENT.into(),
                tool: "cross_encoder_rerank".into(),
                message: format!("Running cross-encoder on {} candidates", documents.len()),
            })
            .await?;

        match cross_encoder.rerank(&query_text, &documents).await {
            Ok(results) => {
                for result in &results {
                    rerank_scores.insert(result.id.clone(), result.score);
                }
                let lo = results.iter().map(|r| r.score).fold(f64::INFINITY, f64::min);
                let hi = results
                    .iter()
                    .map(|r| r.score)
                    .fold(f64::NEG_INFINITY, f64::max);
                writer
                    .emit(Event::ToolResult {
                        agent: AGENT.into(),
                        tool: "cross_encoder_rerank".into(),
                        message: format!(
                            "Cross-encoder scored {} candidates (score range: {:.3} to {:.3})",
                            results.len(),
                            lo,
                            hi
                        ),
                    })
                    .await?;
            }
            Err(e) => {
                tracing::warn!("cross-encoder reranking failed: {e}");
                writer
                    .emit(Event::AgentThought {
                        agent: AGENT.into(),
                        message: format!("Cross-encoder failed ({e}), using RRF scores only"),
                    })
                    .await?;
                for candidate in top_candidates {
                    rerank_scores.insert(candidate.candidate_id.clone(), 0.0);
                }
            }
        }
    }

    writer
        .emit(Event::AgentThought {
            agent: AGENT.into(),
            message: format!(
                "Computing final scores (RRF weight: {}, CE weight: {})",
                cfg.w_rrf, cfg.w_ce
            ),
        })
        .await?;

    let final_results = combine_scores(top_candidates, &rerank_scores, cfg.w_rrf, cfg.w_ce);

    let top3 = final_results
        .iter()
        .take(3)
        .map(|r| format!("{}%", r.final_score))
        .collect::<Vec<_>>()
        .join(", ");

    let elapsed = start.elapsed().as_secs_f64();
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms: (elapsed * 1000.0).round() as u64,
            message: format!(
                "Ranking complete: top scores = {} ({}ms)",
                top3,
                (elapsed * 1000.0).round() as u64
            ),
        })
        .await?;

    Ok((rerank_scores, final_results, elapsed))
}
