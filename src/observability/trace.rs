//! Trace reporting seam.
//!
//! # Responsibilities
//! - Describe one agent turn (user, input, message id) as a trace
//! - Open named child spans and close them with an output value
//! - Hide the backend behind a trait so handlers can run against fakes
//!
//! # Design Decisions
//! - Calls are synchronous enqueues; shipping happens elsewhere
//! - Handles are plain values, nothing is retained after a request ends

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Name of the trace opened for every inbound message.
pub const AGENT_TRACE_NAME: &str = "whatsapp_agent";

/// Inputs of one logical agent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentTurn {
    pub user_id: String,
    pub input: String,
    pub message_id: String,
}

/// Open trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHandle {
    pub id: String,
    pub name: String,
}

impl TraceHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// Open span inside a trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanHandle {
    pub id: String,
    pub trace_id: String,
    pub name: String,
}

impl SpanHandle {
    pub fn new(trace: &TraceHandle, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trace_id: trace.id.clone(),
            name: name.into(),
        }
    }
}

/// Errors raised while recording trace data.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The background exporter has stopped accepting events.
    #[error("trace exporter is closed")]
    ExporterClosed,

    /// The reporter refused the call.
    #[error("trace backend unavailable: {0}")]
    Unavailable(String),
}

/// Capability for reporting agent turns to an observability backend.
pub trait TraceReporter: Send + Sync {
    /// Open a trace named [`AGENT_TRACE_NAME`] for the given turn.
    fn open_trace(&self, turn: &AgentTurn) -> Result<TraceHandle, TraceError>;

    /// Open a named child span.
    fn open_span(&self, trace: &TraceHandle, name: &str) -> Result<SpanHandle, TraceError>;

    /// Close a span with its output value.
    fn close_span(&self, span: SpanHandle, output: Value) -> Result<(), TraceError>;

    /// Attach the final output to a trace.
    fn close_trace(&self, trace: TraceHandle, output: Value) -> Result<(), TraceError>;
}

/// Reporter that ships nothing. Used when no backend credentials are set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl TraceReporter for NoopReporter {
    fn open_trace(&self, turn: &AgentTurn) -> Result<TraceHandle, TraceError> {
        let trace = TraceHandle::new(AGENT_TRACE_NAME);
        tracing::debug!(
            trace_id = %trace.id,
            user_id = %turn.user_id,
            message_id = %turn.message_id,
            "Trace opened (not exported)"
        );
        Ok(trace)
    }

    fn open_span(&self, trace: &TraceHandle, name: &str) -> Result<SpanHandle, TraceError> {
        Ok(SpanHandle::new(trace, name))
    }

    fn close_span(&self, _span: SpanHandle, _output: Value) -> Result<(), TraceError> {
        Ok(())
    }

    fn close_trace(&self, _trace: TraceHandle, _output: Value) -> Result<(), TraceError> {
        Ok(())
    }
}
