//! Progress event stream
//!
//! Every stage emits events through an [`EventWriter`]. The writer is a
//! bounded channel with a single consumer; producers (stage handlers and
//! their fan-out sub-tasks) block on send, so back-pressure never drops
//! events and the order within a stage is well-defined. A closed receiver
//! means the client went away, which cancels the run.

use crate::error::{Result, ShortlistError};
use crate::state::{MissionSpec, ShortlistResponse};
use serde::Serialize;
use tokio::sync::mpsc;

/// Default event channel capacity
pub const EVENT_BUFFER: usize = 64;

/// A progress event emitted by the pipeline
///
/// Serializes with an internal `event` tag so the JSON payload carries its
/// own type, matching the SSE `data:` body.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A stage began
    AgentStart {
        agent: String,
        stage: u8,
        message: String,
    },
    /// Free-form stage commentary (also used for degraded-mode warnings)
    AgentThought { agent: String, message: String },
    /// An external call is about to be made
    ToolCall {
        agent: String,
        tool: String,
        message: String,
    },
    /// An external call returned
    ToolResult {
        agent: String,
        tool: String,
        message: String,
    },
    /// The parsed mission spec, emitted once after query understanding
    MissionSpec {
        agent: String,
        data: MissionSpec,
        message: String,
    },
    /// A stage finished
    StageComplete {
        stage: String,
        timing_ms: u64,
        message: String,
    },
    /// The final payload
    Result {
        data: Box<ShortlistResponse>,
        message: String,
    },
    /// Terminal success marker, always after `Result`
    Done { message: String },
    /// Terminal failure marker
    Error { message: String, stage: String },
}

impl Event {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::AgentStart { .. } => "agent_start",
            Event::AgentThought { .. } => "agent_thought",
            Event::ToolCall { .. } => "tool_call",
            Event::ToolResult { .. } => "tool_result",
            Event::MissionSpec { .. } => "mission_spec",
            Event::StageComplete { .. } => "stage_complete",
            Event::Result { .. } => "result",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
        }
    }

    /// Encode as a Server-Sent Events frame: `event: <type>\ndata: <json>\n\n`
    pub fn to_sse_frame(&self) -> Result<String> {
        let data = serde_json::to_string(self)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.event_type(), data))
    }
}

enum WriterInner {
    Channel(mpsc::Sender<Event>),
    Discard,
}

/// Handle used by stages to emit progress events
#[derive(Clone)]
pub struct EventWriter {
    inner: std::sync::Arc<WriterInner>,
}

impl EventWriter {
    /// Create a bounded writer plus the receiving end for the consumer
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                inner: std::sync::Arc::new(WriterInner::Channel(tx)),
            },
            rx,
        )
    }

    /// Writer that drops every event (non-streaming mode)
    pub fn discard() -> Self {
        Self {
            inner: std::sync::Arc::new(WriterInner::Discard),
        }
    }

    /// Send one event, blocking on back-pressure
    ///
    /// Fails with `Cancelled` when the consumer is gone, which aborts the
    /// pipeline: a disconnected client has no use for further work.
    pub async fn emit(&self, event: Event) -> Result<()> {
        match &*self.inner {
            WriterInner::Channel(tx) => tx
                .send(event)
                .await
                .map_err(|_| ShortlistError::Cancelled("event stream closed by consumer".into())),
            WriterInner::Discard => Ok(()),
        }
    }

    /// Emit without failing the pipeline (used for terminal events where
    /// a vanished consumer no longer matters)
    pub async fn emit_best_effort(&self, event: Event) {
        let _ = self.emit(event).await;
    }
}
