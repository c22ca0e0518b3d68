//! Stage 2: hybrid candidate retrieval
//!
//! First gates candidates through the skills index, then runs lexical and
//! vector chunk searches concurrently over the gated set. Either
//! sub-search may fail with a warning; only the loss of both is fatal.

use super::combined_query_text;
use crate::config::PipelineConfig;
use crate::error::{Result, ShortlistError};
use crate::llm::Embedder;
use crate::search::{lexical_search, vector_search};
use crate::state::{MissionSpec, RetrievalHit};
use crate::store::DocumentStore;
use crate::stream::{Event, EventWriter};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

pub(crate) const STAGE_NAME: &str = "retrieval";
const AGENT: &str = "Retriever";

pub(crate) async fn run(
    spec: &MissionSpec,
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
    cfg: &PipelineConfig,
    writer: &EventWriter,
) -> Result<(Vec<RetrievalHit>, Vec<RetrievalHit>, f64)> {
    let start = Instant::now();

    writer
        .emit(Event::AgentStart {
            agent: AGENT.into(),
            stage: 2,
            message: "Starting multi-strategy candidate retrieval".into(),
        })
        .await?;

    // Step 1: skill-based candidate gating
    let mut gate_ids: Vec<String> = Vec::new();
    let mut matched_skills_map: HashMap<String, Vec<String>> = HashMap::new();

    if !spec.must_have.is_empty() {
        let preview = spec
            .must_have
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let suffix = if spec.must_have.len() > 5 { "..." } else { "" };
        writer
            .emit(Event::ToolCall {
                agent: AGENT.into(),
                tool: "search_skills".into(),
                message: format!("Searching skills index for: {preview}{suffix}"),
            })
            .await?;

        let min_match = (spec.must_have.len() / 2).max(1);
        match store
            .search_skills(&spec.must_have, min_match, cfg.k_pool)
            .await
        {
            Ok(matches) => {
                for m in &matches {
                    matched_skills_map.insert(m.candidate_id.clone(), m.matched_skills.clone());
                }
                gate_ids = matches.into_iter().map(|m| m.candidate_id).collect();
                writer
                    .emit(Event::ToolResult {
                        agent: AGENT.into(),
                        tool: "search_skills".into(),
                        message: format!(
                            "Found {} candidates matching skills (min {}/{})",
                            gate_ids.len(),
                            min_match,
                            spec.must_have.len()
                        ),
                    })
                    .await?;
                if gate_ids.is_empty() {
                    writer
                        .emit(Event::AgentThought {
                            agent: AGENT.into(),
                            message: "Skill gate matched no candidates, searching all candidates"
                                .into(),
                        })
                        .await?;
                }
            }
            Err(e) => {
                tracing::warn!("skills gate failed, searching unbounded: {e}");
                writer
                    .emit(Event::AgentThought {
                        agent: AGENT.into(),
                        message: format!("Skills index unavailable ({e}), searching all candidates"),
                    })
                    .await?;
            }
        }
    }

    let gate: Option<&[String]> = if gate_ids.is_empty() {
        None
    } else {
        Some(&gate_ids)
    };

    // Step 2: hybrid retrieval over the gated chunk set
    let query_text = combined_query_text(spec);
    if query_text.trim().is_empty() {
        writer
            .emit(Event::AgentThought {
                agent: AGENT.into(),
                message: "Empty query and no skills to search with, skipping chunk retrieval"
                    .into(),
            })
            .await?;
        let elapsed = start.elapsed().as_secs_f64();
        writer
            .emit(Event::StageComplete {
                stage: STAGE_NAME.into(),
                timing_ms: (elapsed * 1000.0).round() as u64,
                message: "Retrieval complete: nothing to search".into(),
            })
            .await?;
        return Ok((vec![], vec![], elapsed));
    }

    writer
        .emit(Event::AgentThought {
            agent: AGENT.into(),
            message: format!(
                "Running parallel retrieval: lexical + vector search across {} candidates",
                if gate.is_some() { "gated" } else { "all" }
            ),
        })
        .await?;
    writer
        .emit(Event::ToolCall {
            agent: AGENT.into(),
            tool: "lexical_search".into(),
            message: "Running keyword search on resume chunks".into(),
        })
        .await?;
    writer
        .emit(Event::ToolCall {
            agent: AGENT.into(),
            tool: "vector_search".into(),
            message: "Running semantic search on resume chunks".into(),
        })
        .await?;

    let lexical_fut = async {
        let chunks = store.fetch_chunks(gate, false).await?;
        Ok::<_, ShortlistError>(lexical_search(
            &chunks,
            &query_text,
            cfg.k_sparse,
            cfg.max_chars_per_chunk,
            &matched_skills_map,
        ))
    };
    let vector_fut = async {
        let query_embedding = embedder.embed(&query_text).await?;
        let chunks = store.fetch_chunks(gate, true).await?;
        Ok::<_, ShortlistError>(vector_search(
            &chunks,
            &query_embedding,
            cfg.k_dense,
            cfg.max_chars_per_chunk,
        ))
    };

    let (sparse_res, dense_res) = tokio::join!(lexical_fut, vector_fut);

    let (sparse_results, dense_results) = match (sparse_res, dense_res) {
        (Ok(sparse), Ok(dense)) => (sparse, dense),
        (Ok(sparse), Err(e)) => {
            tracing::warn!("vector search failed: {e}");
            writer
                .emit(Event::AgentThought {
                    agent: AGENT.into(),
                    message: format!("Vector search failed ({e}), continuing with lexical only"),
                })
                .await?;
            (sparse, vec![])
        }
        (Err(e), Ok(dense)) => {
            tracing::warn!("lexical search failed: {e}");
            writer
                .emit(Event::AgentThought {
                    agent: AGENT.into(),
                    message: format!("Lexical search failed ({e}), continuing with vector only"),
                })
                .await?;
            (vec![], dense)
        }
        (Err(lexical_err), Err(vector_err)) => {
            return Err(ShortlistError::Search(format!(
                "both retrieval paths failed: lexical: {lexical_err}; vector: {vector_err}"
            )));
        }
    };

    writer
        .emit(Event::ToolResult {
            agent: AGENT.into(),
            tool: "lexical_search".into(),
            message: format!("Lexical search returned {} chunk hits", sparse_results.len()),
        })
        .await?;
    writer
        .emit(Event::ToolResult {
            agent: AGENT.into(),
            tool: "vector_search".into(),
            message: format!("Vector search returned {} chunk hits", dense_results.len()),
        })
        .await?;

    let unique_candidates: HashSet<&str> = sparse_results
        .iter()
        .chain(dense_results.iter())
        .map(|hit| hit.candidate_id.as_str())
        .collect();

    let elapsed = start.elapsed().as_secs_f64();
    writer
        .emit(Event::StageComplete {
            stage: STAGE_NAME.into(),
            timing_ms: (elapsed * 1000.0).round() as u64,
            message: format!(
                "Retrieval complete: {} lexical + {} vector hits from {} unique candidates ({}ms)",
                sparse_results.len(),
                dense_results.len(),
                unique_candidates.len(),
                (elapsed * 1000.0).round() as u64
            ),
        })
        .await?;

    Ok((sparse_results, dense_results, elapsed))
}
