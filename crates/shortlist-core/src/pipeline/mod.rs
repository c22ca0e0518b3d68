//! The six-stage shortlist pipeline
//!
//! Stages run strictly in order over one [`RunState`]; each stage reads
//! the fields its predecessors wrote and returns its outputs, which the
//! pipeline applies before the next stage begins. External calls inside a
//! stage may fan out, but the state is only touched between stages.

mod assembly;
mod evidence;
mod fusion;
mod query;
mod ranking;
mod retrieval;

pub use assembly::is_domain_relevant;
pub use evidence::build_evidence_pack;
pub use fusion::fuse;
pub use ranking::combine_scores;

use crate::config::PipelineConfig;
use crate::error::{Result, ShortlistError};
use crate::llm::{CrossEncoder, Embedder, HighlightWriter, QueryParser};
use crate::state::{MissionSpec, RunState, ShortlistResponse};
use crate::store::DocumentStore;
use crate::stream::{Event, EventWriter};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique request id (short hex digest)
pub fn new_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(counter.to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest.chars().take(32).collect()
}

/// Query text used for chunk retrieval and reranking
///
/// The raw query when present, else the skill union rendered as
/// `"Skills: a; b."`, else empty (nothing to search with).
pub(crate) fn combined_query_text(spec: &MissionSpec) -> String {
    if !spec.raw_query.trim().is_empty() {
        return spec.raw_query.clone();
    }
    let union = spec.skill_union();
    if union.is_empty() {
        String::new()
    } else {
        format!("Skills: {}.", union.join("; "))
    }
}

/// Handle to the shortlist pipeline
///
/// Holds the shared backends; cheap to clone per request via `Arc`s. The
/// query parser and highlight writer are optional strategies; without
/// them the deterministic fallbacks run.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    cross_encoder: Arc<dyn CrossEncoder>,
    query_parser: Option<Arc<dyn QueryParser>>,
    highlight_writer: Option<Arc<dyn HighlightWriter>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        cross_encoder: Arc<dyn CrossEncoder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            cross_encoder,
            query_parser: None,
            highlight_writer: None,
            config,
        }
    }

    /// Attach an LLM query parser
    pub fn with_query_parser(mut self, parser: Arc<dyn QueryParser>) -> Self {
        self.query_parser = Some(parser);
        self
    }

    /// Attach an LLM highlight writer
    pub fn with_highlight_writer(mut self, writer: Arc<dyn HighlightWriter>) -> Self {
        self.highlight_writer = Some(writer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline, streaming progress events to `writer`
    ///
    /// Enforces the request deadline; on expiry or fatal stage failure a
    /// terminal `error` event is emitted (if the stream is still alive)
    /// and the error is returned.
    pub async fn run(&self, query_text: &str, writer: &EventWriter) -> Result<ShortlistResponse> {
        let mut state = RunState::new(new_request_id(), query_text);
        let current_stage: Arc<Mutex<&'static str>> = Arc::new(Mutex::new(query::STAGE_NAME));
        let deadline = Duration::from_secs(self.config.deadline_secs);

        let outcome = tokio::time::timeout(
            deadline,
            self.execute(&mut state, writer, &current_stage),
        )
        .await;

        let stage_name = |current: &Arc<Mutex<&'static str>>| -> String {
            current
                .lock()
                .map(|stage| (*stage).to_string())
                .unwrap_or_else(|_| "pipeline".to_string())
        };

        match outcome {
            Ok(Ok(response)) => {
                writer
                    .emit_best_effort(Event::Done {
                        message: "Pipeline complete".into(),
                    })
                    .await;
                Ok(response)
            }
            Ok(Err(e)) => {
                if !e.is_cancellation() {
                    tracing::error!("pipeline failed at {}: {e}", stage_name(&current_stage));
                    writer
                        .emit_best_effort(Event::Error {
                            message: e.to_string(),
                            stage: stage_name(&current_stage),
                        })
                        .await;
                }
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "request deadline ({}s) exceeded at {}",
                    self.config.deadline_secs,
                    stage_name(&current_stage)
                );
                writer
                    .emit_best_effort(Event::Error {
                        message: "request deadline exceeded".into(),
                        stage: stage_name(&current_stage),
                    })
                    .await;
                Err(ShortlistError::DeadlineExceeded)
            }
        }
    }

    /// Non-streaming entry point: run to completion, return the response
    pub async fn run_collect(&self, query_text: &str) -> Result<ShortlistResponse> {
        self.run(query_text, &EventWriter::discard()).await
    }

    async fn execute(
        &self,
        state: &mut RunState,
        writer: &EventWriter,
        current_stage: &Arc<Mutex<&'static str>>,
    ) -> Result<ShortlistResponse> {
        let set_stage = |name: &'static str| {
            if let Ok(mut guard) = current_stage.lock() {
                *guard = name;
            }
        };

        // Stage 1: query understanding
        set_stage(query::STAGE_NAME);
        let (spec, elapsed) =
            query::run(&state.query_text, self.query_parser.as_deref(), writer).await?;
        state.mission_spec = Some(spec.clone());
        state
            .stage_timings
            .insert(query::STAGE_NAME.to_string(), elapsed);

        // Stage 2: hybrid retrieval
        set_stage(retrieval::STAGE_NAME);
        let (sparse, dense, elapsed) = retrieval::run(
            &spec,
            self.store.as_ref(),
            self.embedder.as_ref(),
            &self.config,
            writer,
        )
        .await?;
        state.sparse_results = sparse;
        state.dense_results = dense;
        state
            .stage_timings
            .insert(retrieval::STAGE_NAME.to_string(), elapsed);

        // Stage 3: fusion
        set_stage(fusion::STAGE_NAME);
        let (fused, elapsed) = fusion::run(
            &state.sparse_results,
            &state.dense_results,
            &self.config,
            writer,
        )
        .await?;
        state.fused_candidates = fused;
        state
            .stage_timings
            .insert(fusion::STAGE_NAME.to_string(), elapsed);

        // Stage 4: evidence
        set_stage(evidence::STAGE_NAME);
        let (packs, elapsed) = evidence::run(
            &state.fused_candidates,
            &state.sparse_results,
            &state.dense_results,
            &spec,
            self.highlight_writer.as_deref(),
            &self.config,
            writer,
        )
        .await?;
        state.evidence_packs = packs;
        state
            .stage_timings
            .insert(evidence::STAGE_NAME.to_string(), elapsed);

        // Stage 5: ranking
        set_stage(ranking::STAGE_NAME);
        let (rerank_scores, final_results, elapsed) = ranking::run(
            &state.fused_candidates,
            &state.evidence_packs,
            &spec,
            self.cross_encoder.as_ref(),
            &self.config,
            writer,
        )
        .await?;
        state.rerank_scores = rerank_scores;
        state.final_results = final_results;
        state
            .stage_timings
            .insert(ranking::STAGE_NAME.to_string(), elapsed);

        // Stage 6: assembly
        set_stage(assembly::STAGE_NAME);
        let (response, elapsed) =
            assembly::run(state, self.store.as_ref(), &self.config, writer).await?;
        state
            .stage_timings
            .insert(assembly::STAGE_NAME.to_string(), elapsed);

        Ok(response)
    }
}
