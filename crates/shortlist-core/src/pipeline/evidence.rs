//! Stage 4: bounded evidence assembly
//!
//! For the top reranking candidates, collects their chunks from both
//! retrieval lists into a deduplicated, precedence-sorted pack under two
//! hard bounds (item count and total snippet characters). Highlights are
//! LLM-written for the first few candidates with a deterministic prefix
//! fallback everywhere else.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::llm::HighlightWriter;
use crate::state::{EvidenceItem, EvidencePack, FusedCandidate, MissionSpec, RetrievalHit, WhyMatched};
use crate::stream::{Event, EventWriter};
use crate::text::{char_len, truncate_chars};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "evidence_building";
const AGENT: &str = "Evidence Builder";

/// Minimum character budget worth truncating a snippet into
const MIN_TRUNCATION_BUDGET: usize = 50;

/// Fallback highlight prefix length
const FALLBACK_HIGHLIGHT_CHARS: usize = 100;

fn precedence(why: WhyMatched) -> u8 {
    match why {
        WhyMatched::Both => 0,
        WhyMatched::Lexical => 1,
        WhyMatched::Vector => 2,
    }
}

fn group_by_candidate(results: &[RetrievalHit]) -> HashMap<&str, Vec<&RetrievalHit>> {
    let mut grouped: HashMap<&str, Vec<&RetrievalHit>> = HashMap::new();
    for hit in results {
        grouped.entry(hit.candidate_id.as_str()).or_default().push(hit);
    }
    grouped
}

/// Build one candidate's bounded evidence pack
pub fn build_evidence_pack(
    candidate_id: &str,
    sparse_chunks: &[&RetrievalHit],
    dense_chunks: &[&RetrievalHit],
    cfg: &PipelineConfig,
) -> EvidencePack {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut items: Vec<EvidenceItem> = Vec::new();

    for chunk in sparse_chunks {
        if !seen.contains_key(chunk.chunk_id.as_str()) {
            seen.insert(&chunk.chunk_id, items.len());
            items.push(EvidenceItem {
                chunk_id: chunk.chunk_id.clone(),
                section: chunk.section_type.clone(),
                text_snippet: truncate_chars(&chunk.chunk_text, cfg.max_chars_per_chunk),
                why_matched: WhyMatched::Lexical,
            });
        }
    }

    for chunk in dense_chunks {
        match seen.get(chunk.chunk_id.as_str()) {
            Some(&idx) => items[idx].why_matched = WhyMatched::Both,
            None => {
                seen.insert(&chunk.chunk_id, items.len());
                items.push(EvidenceItem {
                    chunk_id: chunk.chunk_id.clone(),
                    section: chunk.section_type.clone(),
                    text_snippet: truncate_chars(&chunk.chunk_text, cfg.max_chars_per_chunk),
                    why_matched: WhyMatched::Vector,
                });
            }
        }
    }

    // Prefer chunks both searches agreed on, longer snippets first
    items.sort_by(|a, b| {
        precedence(a.why_matched)
            .cmp(&precedence(b.why_matched))
            .then_with(|| char_len(&b.text_snippet).cmp(&char_len(&a.text_snippet)))
    });

    let mut bounded: Vec<EvidenceItem> = Vec::new();
    let mut total_chars = 0usize;
    for mut item in items {
        if bounded.len() >= cfg.max_chunks_per_candidate {
            break;
        }
        let snippet_len = char_len(&item.text_snippet);
        if total_chars + snippet_len > cfg.max_total_chars_per_candidate {
            let remaining = cfg.max_total_chars_per_candidate - total_chars;
            if remaining > MIN_TRUNCATION_BUDGET {
                // The ellipsis counts against the budget; the bound is hard
                item.text_snippet =
                    format!("{}...", truncate_chars(&item.text_snippet, remaining - 3));
                bounded.push(item);
            }
            break;
        }
        total_chars += snippet_len;
        bounded.push(item);
    }

    let highlights = fallback_highlights(&bounded);

    EvidencePack {
        candidate_id: candidate_id.to_string(),
        evidence: bounded,
        highlights,
    }
}

/// Prefix of each of the first three snippets
fn fallback_highlights(items: &[EvidenceItem]) -> Vec<String> {
    items
        .iter()
        .take(3)
        .map(|item| truncate_chars(&item.text_snippet, FALLBACK_HIGHLIGHT_CHARS))
        .collect()
}

pub(crate) async fn run(
    fused: &[FusedCandidate],
    sparse_results: &[RetrievalHit],
    dense_results: &[RetrievalHit],
    spec: &MissionSpec,
    highlighter: Option<&dyn HighlightWriter>,
    cfg: &PipelineConfig,
    writer: &EventWriter,
) -> Result<(HashMap<String, EvidencePack>, f64)> {
    let start = Instant::now();

    let top_candidates = &fused[..fused.len().min(cfg.k_rerank)];

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 4,
            message: format!(
                "Building evidence packs for top {} candidates",
                top_candidates.len()
            ),
        })
        .await?;

    let sparse_by_candidate = group_by_candidate(sparse_results);
    let dense_by_candidate = group_by_candidate(dense_results);

    let mut packs: HashMap<String, EvidencePack> = HashMap::new();
    for candidate in top_candidates {
        let cid = candidate.candidate_id.as_str();
        let pack = build_evidence_pack(
            cid,
            sparse_by_candidate.get(cid).map(Vec::as_slice).unwrap_or(&[]),
            dense_by_candidate.get(cid).map(Vec::as_slice).unwrap_or(&[]),
            cfg,
        );
        packs.insert(candidate.candidate_id.clone(), pack);
    }

    let mut highlights_generated = 0usize;
    if let Some(highlighter) = highlighter {
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: format!(
                    "Built evidence packs for {} candidates. Generating highlights",
                    packs.len()
                ),
            })
            .await?;

        // First candidates by rank order, skipping packs with no evidence
        let prompts: Vec<(String, String)> = top_candidates
            .iter()
            .take(cfg.max_llm_highlights)
            .filter_map(|candidate| {
                let pack = packs.get(&candidate.candidate_id)?;
                let evidence_text = pack
                    .evidence
                    .iter()
                    .map(|e| format!("[{}] {}", e.section, e.text_snippet))
                    .collect::<Vec<_>>()
                    .join("\n");
                if evidence_text.is_empty() {
                    None
                } else {
                    Some((candidate.candidate_id.clone(), evidence_text))
                }
            })
            .collect();

        let generated: Vec<(String, Option<Vec<String>>)> = stream::iter(prompts)
            .map(|(cid, evidence_text)| {
                let writer = writer.clone();
                async move {
                    writer
                        .emit_best_effort(Event::ToolCall {
                            agent: AGENT.into(),
                            tool: "generate_highlights".into(),
                            message: format!(
                                "Generating highlights for candidate {}",
                                truncate_chars(&cid, 8)
                            ),
                        })
                        .await;
                    match highlighter
                        .generate_highlights(&spec.must_have, &spec.nice_to_have, &evidence_text)
                        .await
                    {
                        Ok(lines) if !lines.is_empty() => (cid, Some(lines)),
                        Ok(_) => (cid, None),
                        Err(e) => {
                            tracing::warn!("highlight generation failed for {cid}: {e}");
                            (cid, None)
                        }
                    }
                }
            })
            .buffer_unordered(cfg.highlight_concurrency.max(1))
            .collect()
            .await;

        for (cid, lines) in generated {
            if let (Some(lines), Some(pack)) = (lines, packs.get_mut(&cid)) {
                pack.highlights = lines;
                highlights_generated += 1;
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms: (elapsed * 1000.0).round() as u64,
            message: format!(
                "Evidence built: {} packs, {} LLM highlights ({}ms)",
                packs.len(),
                highlights_generated,
                (elapsed * 1000.0).round() as u64
            ),
        })
        .await?;

    Ok((packs, elapsed))
}
