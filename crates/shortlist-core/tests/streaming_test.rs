//! Event stream behavior: ordering guarantees, SSE encoding,
//! client disconnect and the request deadline.

mod common;

use common::*;
use async_trait::async_trait;
use shortlist_core::{
    ChunkRecord, DocumentStore, Event, EventWriter, MatchQuality, Pipeline, PipelineConfig,
    ProfileRecord, Result, SkillMatch,
};
use std::sync::Arc;

fn test_config() -> PipelineConfig {
    PipelineConfig {
        deadline_secs: 120,
        ..PipelineConfig::default()
    }
}

async fn run_and_collect(query: &str) -> (MatchQuality, Vec<Event>) {
    let pipeline = Pipeline::new(
        Arc::new(seed_python_store()),
        Arc::new(FixedEmbedder),
        Arc::new(TermCountCrossEncoder),
        test_config(),
    )
    .with_highlight_writer(Arc::new(StubHighlightWriter));

    let (writer, mut rx) = EventWriter::channel(64);
    let query = query.to_string();
    let handle = tokio::spawn(async move { pipeline.run(&query, &writer).await });

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let response = handle.await.unwrap().unwrap();
    (response.match_quality, events)
}

#[tokio::test]
async fn test_event_ordering_guarantees() {
    let (quality, events) = run_and_collect("python").await;
    assert_eq!(quality, MatchQuality::Strong);

    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();

    // terminal ordering: result immediately precedes done, done is last
    assert_eq!(types.last(), Some(&"done"));
    let result_pos = types.iter().position(|t| *t == "result").unwrap();
    let done_pos = types.iter().position(|t| *t == "done").unwrap();
    assert!(result_pos < done_pos);
    assert!(!types.contains(&"error"));

    // six stages begin and complete, in stage order
    let starts: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            Event::AgentStart { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(starts, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(types.iter().filter(|t| **t == "stage_complete").count(), 6);

    // mission_spec arrives during stage 1, before stage 2 starts
    let mission_pos = types.iter().position(|t| *t == "mission_spec").unwrap();
    let stage2_pos = events
        .iter()
        .position(|e| matches!(e, Event::AgentStart { stage: 2, .. }))
        .unwrap();
    assert!(mission_pos < stage2_pos);

    // within each stage: agent_start before tool events before stage_complete
    let mut current_start: Option<usize> = None;
    let mut last_complete = 0usize;
    for (i, event) in events.iter().enumerate() {
        match event {
            Event::AgentStart { .. } => {
                assert!(i >= last_complete);
                current_start = Some(i);
            }
            Event::ToolCall { .. } | Event::ToolResult { .. } => {
                assert!(current_start.is_some_and(|s| s < i));
            }
            Event::StageComplete { .. } => {
                assert!(current_start.is_some_and(|s| s < i));
                last_complete = i;
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_events_encode_as_sse_frames() {
    let (_, events) = run_and_collect("python").await;
    for event in &events {
        let frame = event.to_sse_frame().unwrap();
        assert!(frame.starts_with(&format!("event: {}\n", event.event_type())));
        let data = frame
            .lines()
            .nth(1)
            .and_then(|l| l.strip_prefix("data: "))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(data).unwrap();
        assert_eq!(json["event"], event.event_type());
    }
}

#[tokio::test]
async fn test_client_disconnect_cancels_run() {
    let pipeline = Pipeline::new(
        Arc::new(seed_python_store()),
        Arc::new(FixedEmbedder),
        Arc::new(TermCountCrossEncoder),
        test_config(),
    );

    let (writer, rx) = EventWriter::channel(1);
    drop(rx);

    let err = pipeline.run("python", &writer).await.unwrap_err();
    assert!(err.is_cancellation());
}

/// Store whose chunk fetch hangs far past the deadline
struct HangingStore;

#[async_trait]
impl DocumentStore for HangingStore {
    async fn search_skills(
        &self,
        _skills: &[String],
        _min_match: usize,
        _limit: usize,
    ) -> Result<Vec<SkillMatch>> {
        Ok(vec![])
    }

    async fn fetch_chunks(
        &self,
        _candidate_ids: Option<&[String]>,
        _with_embeddings: bool,
    ) -> Result<Vec<ChunkRecord>> {
        tokio::time::sleep(std::time::Duration::from_secs(600)).await;
        Ok(vec![])
    }

    async fn fetch_profiles(&self, _candidate_ids: &[String]) -> Result<Vec<ProfileRecord>> {
        Ok(vec![])
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_emits_terminal_error() {
    let pipeline = Pipeline::new(
        Arc::new(HangingStore),
        Arc::new(FixedEmbedder),
        Arc::new(TermCountCrossEncoder),
        test_config(),
    );

    let (writer, mut rx) = EventWriter::channel(64);
    let handle = tokio::spawn(async move { pipeline.run("python", &writer).await });

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_cancellation());

    match events.last() {
        Some(Event::Error { message, stage }) => {
            assert!(message.contains("deadline"));
            assert_eq!(stage, "retrieval");
        }
        other => panic!("expected terminal error event, got {other:?}"),
    }
}
