//! Stage 3: reciprocal rank fusion
//!
//! Pure and deterministic: no I/O, no model calls, no randomness. The
//! same input lists always produce the identical output, order included.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::state::{FusedCandidate, RetrievalHit};
use crate::stream::{Event, EventWriter};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "fusion";
const AGENT: &str = "Fusion";

/// Aggregate chunk-level hits to resume level, keeping each candidate's
/// best (lowest) chunk rank
fn best_ranks(results: &[RetrievalHit]) -> HashMap<String, usize> {
    let mut ranks: HashMap<String, usize> = HashMap::new();
    for hit in results {
        ranks
            .entry(hit.candidate_id.clone())
            .and_modify(|best| {
                if hit.rank < *best {
                    *best = hit.rank;
                }
            })
            .or_insert(hit.rank);
    }
    ranks
}

/// Fuse the two ranked lists into resume-level candidates
///
/// `rrf(c) = Σ 1/(k + rank_s(c))` over the sources where the candidate
/// appears. Sorted by score descending; equal scores break by candidate
/// id ascending so the output is stable across runs.
pub fn fuse(
    sparse_results: &[RetrievalHit],
    dense_results: &[RetrievalHit],
    rrf_k: f64,
    k_pool: usize,
) -> Vec<FusedCandidate> {
    let sparse_ranks = best_ranks(sparse_results);
    let dense_ranks = best_ranks(dense_results);

    // matched_skills come from the first lexical hit per candidate
    let mut gate_skills: HashMap<&str, &[String]> = HashMap::new();
    for hit in sparse_results {
        gate_skills
            .entry(hit.candidate_id.as_str())
            .or_insert(&hit.matched_skills);
    }

    let all_ids: HashSet<&String> = sparse_ranks.keys().chain(dense_ranks.keys()).collect();

    let mut fused: Vec<FusedCandidate> = all_ids
        .into_iter()
        .map(|candidate_id| {
            let sparse_rank = sparse_ranks.get(candidate_id).copied();
            let dense_rank = dense_ranks.get(candidate_id).copied();

            let mut rrf_score = 0.0;
            if let Some(rank) = sparse_rank {
                rrf_score += 1.0 / (rrf_k + rank as f64);
            }
            if let Some(rank) = dense_rank {
                rrf_score += 1.0 / (rrf_k + rank as f64);
            }

            let matched_skills = gate_skills
                .get(candidate_id.as_str())
                .map(|skills| skills.to_vec())
                .unwrap_or_default();
            let matched_count = matched_skills.len();

            FusedCandidate {
                candidate_id: candidate_id.clone(),
                rrf_score,
                dense_rank,
                sparse_rank,
                matched_skills,
                matched_count,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    fused.truncate(k_pool);
    fused
}

pub(crate) async fn run(
    sparse_results: &[RetrievalHit],
    dense_results: &[RetrievalHit],
    cfg: &PipelineConfig,
    writer: &EventWriter,
) -> Result<(Vec<FusedCandidate>, f64)> {
    let start = Instant::now();

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 3,
            message: "Fusing lexical + vector results using reciprocal rank fusion".into(),
        })
        .await?;

    let sparse_ids: HashSet<&str> = sparse_results
        .iter()
        .map(|h| h.candidate_id.as_str())
        .collect();
    let dense_ids: HashSet<&str> = dense_results
        .iter()
        .map(|h| h.candidate_id.as_str())
        .collect();

    writer
        .emit(Event::AgentThought {
            agent: AGENT.into(),
            message: format!(
                "Fusing {} lexical candidates + {} vector candidates = {} unique (k={})",
                sparse_ids.len(),
                dense_ids.len(),
                sparse_ids.union(&dense_ids).count(),
                cfg.rrf_k
            ),
        })
        .await?;

    let fused = fuse(sparse_results, dense_results, cfg.rrf_k, cfg.k_pool);

    let both = sparse_ids.intersection(&dense_ids).count();
    let sparse_only = sparse_ids.difference(&dense_ids).count();
    let dense_only = dense_ids.difference(&sparse_ids).count();

    let elapsed = start.elapsed().as_secs_f64();
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms: (elapsed * 1000.0).round() as u64,
            message: format!(
                "Fusion complete: {} candidates ranked (both: {}, lexical-only: {}, vector-only: {}) ({}ms)",
                fused.len(),
                both,
                sparse_only,
                dense_only,
                (elapsed * 1000.0).round() as u64
            ),
        })
        .await?;

    Ok((fused, elapsed))
}
