//! Langfuse trace backend.
//!
//! # Data Flow
//! ```text
//! handler
//!     → LangfuseReporter (build ingestion event, enqueue)
//!     → bounded channel (full queue drops the event)
//!     → LangfuseExporter task (batch by size or interval)
//!     → POST {host}/api/public/ingestion (basic auth)
//! ```
//!
//! # Design Decisions
//! - Export is fire-and-forget: failures are logged and counted, never
//!   returned to a request handler
//! - No retry; a failed batch is dropped
//! - A stalled backend cannot grow memory: events beyond the queue capacity
//!   are dropped and counted
//! - Shutdown drains the queue and flushes once more

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::LangfuseConfig;
use crate::observability::metrics;
use crate::observability::trace::{
    AgentTurn, SpanHandle, TraceError, TraceHandle, TraceReporter, AGENT_TRACE_NAME,
};

/// Hosted backend used when no host is configured.
pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

const INGESTION_PATH: &str = "/api/public/ingestion";
const EXPORT_TIMEOUT_SECS: u64 = 10;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// One entry of an ingestion batch.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionEvent {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: Value,
}

impl IngestionEvent {
    fn new(kind: &'static str, body: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: now_rfc3339(),
            kind,
            body,
        }
    }

    pub fn trace_create(trace: &TraceHandle, turn: &AgentTurn) -> Self {
        Self::new(
            "trace-create",
            json!({
                "id": trace.id,
                "timestamp": now_rfc3339(),
                "name": trace.name,
                "userId": turn.user_id,
                "input": turn.input,
                "metadata": { "messageId": turn.message_id },
            }),
        )
    }

    /// Trace creation is an upsert on the backend, so the same event type
    /// carries the final output.
    pub fn trace_output(trace: &TraceHandle, output: Value) -> Self {
        Self::new(
            "trace-create",
            json!({
                "id": trace.id,
                "output": output,
            }),
        )
    }

    pub fn span_create(span: &SpanHandle) -> Self {
        Self::new(
            "span-create",
            json!({
                "id": span.id,
                "traceId": span.trace_id,
                "name": span.name,
                "startTime": now_rfc3339(),
            }),
        )
    }

    pub fn span_update(span: &SpanHandle, output: Value) -> Self {
        Self::new(
            "span-update",
            json!({
                "id": span.id,
                "traceId": span.trace_id,
                "endTime": now_rfc3339(),
                "output": output,
            }),
        )
    }
}

/// Reporter that turns trace calls into queued ingestion events.
#[derive(Debug, Clone)]
pub struct LangfuseReporter {
    tx: mpsc::Sender<IngestionEvent>,
}

impl LangfuseReporter {
    pub fn new(tx: mpsc::Sender<IngestionEvent>) -> Self {
        Self { tx }
    }

    fn enqueue(&self, event: IngestionEvent) -> Result<(), TraceError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::debug!(kind = event.kind, "Trace queue full, event dropped");
                metrics::record_trace_dropped();
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(TraceError::ExporterClosed),
        }
    }
}

impl TraceReporter for LangfuseReporter {
    fn open_trace(&self, turn: &AgentTurn) -> Result<TraceHandle, TraceError> {
        let trace = TraceHandle::new(AGENT_TRACE_NAME);
        self.enqueue(IngestionEvent::trace_create(&trace, turn))?;
        Ok(trace)
    }

    fn open_span(&self, trace: &TraceHandle, name: &str) -> Result<SpanHandle, TraceError> {
        let span = SpanHandle::new(trace, name);
        self.enqueue(IngestionEvent::span_create(&span))?;
        Ok(span)
    }

    fn close_span(&self, span: SpanHandle, output: Value) -> Result<(), TraceError> {
        self.enqueue(IngestionEvent::span_update(&span, output))
    }

    fn close_trace(&self, trace: TraceHandle, output: Value) -> Result<(), TraceError> {
        self.enqueue(IngestionEvent::trace_output(&trace, output))
    }
}

/// Background task shipping queued events to the ingestion endpoint.
pub struct LangfuseExporter {
    client: reqwest::Client,
    endpoint: String,
    public_key: String,
    secret_key: String,
    batch_size: usize,
    flush_interval: Duration,
    rx: mpsc::Receiver<IngestionEvent>,
}

impl LangfuseExporter {
    /// Create a reporter/exporter pair for the given configuration.
    pub fn new(config: &LangfuseConfig) -> Result<(LangfuseReporter, Self), TraceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TraceError::Unavailable(e.to_string()))?;

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let exporter = Self {
            client,
            endpoint: ingestion_endpoint(&config.host),
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
            batch_size: config.batch_size.max(1),
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
            rx,
        };
        Ok((LangfuseReporter::new(tx), exporter))
    }

    /// Ingestion URL this exporter posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Spawn the export loop on the current runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Drain the queue until shutdown or until every reporter is dropped.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(endpoint = %self.endpoint, "Trace exporter started");

        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.flush_interval,
            self.flush_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pending: Vec<IngestionEvent> = Vec::new();

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(event) => {
                        pending.push(event);
                        if pending.len() >= self.batch_size {
                            self.flush(&mut pending).await;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.flush(&mut pending).await,
                _ = shutdown.recv() => {
                    self.rx.close();
                    while let Ok(event) = self.rx.try_recv() {
                        pending.push(event);
                    }
                    break;
                }
            }
        }

        self.flush(&mut pending).await;
        tracing::info!("Trace exporter stopped");
    }

    async fn flush(&self, pending: &mut Vec<IngestionEvent>) {
        if pending.is_empty() {
            return;
        }
        let batch = std::mem::take(pending);
        let count = batch.len();

        let result = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&json!({ "batch": batch }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                // 207 answers list per-event failures.
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let rejected = body
                    .get("errors")
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0);
                if rejected > 0 {
                    tracing::warn!(rejected, events = count, "Trace backend rejected events");
                }
                tracing::debug!(events = count, "Trace batch exported");
                metrics::record_trace_export("ok", count);
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                tracing::warn!(status = %status, body = %text, events = count, "Trace export rejected");
                metrics::record_trace_export("error", count);
            }
            Err(e) => {
                tracing::warn!(error = %e, events = count, "Trace export failed");
                metrics::record_trace_export("error", count);
            }
        }
    }
}

fn ingestion_endpoint(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    format!("{}{}", host, INGESTION_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> AgentTurn {
        AgentTurn {
            user_id: "5511999999999@s.whatsapp.net".into(),
            input: "oi".into(),
            message_id: "ABC123".into(),
        }
    }

    #[test]
    fn test_ingestion_endpoint_defaults_and_trims() {
        assert_eq!(
            ingestion_endpoint(""),
            "https://cloud.langfuse.com/api/public/ingestion"
        );
        assert_eq!(
            ingestion_endpoint("http://localhost:3000/"),
            "http://localhost:3000/api/public/ingestion"
        );
    }

    #[test]
    fn test_trace_create_carries_turn() {
        let trace = TraceHandle::new(AGENT_TRACE_NAME);
        let event = IngestionEvent::trace_create(&trace, &turn());
        assert_eq!(event.kind, "trace-create");
        assert_eq!(event.body["id"], trace.id.as_str());
        assert_eq!(event.body["name"], "whatsapp_agent");
        assert_eq!(event.body["userId"], "5511999999999@s.whatsapp.net");
        assert_eq!(event.body["input"], "oi");
        assert_eq!(event.body["metadata"]["messageId"], "ABC123");
    }

    #[test]
    fn test_event_serializes_type_field() {
        let trace = TraceHandle::new(AGENT_TRACE_NAME);
        let span = SpanHandle::new(&trace, "llm_call");
        let value = serde_json::to_value(IngestionEvent::span_update(&span, json!("done"))).unwrap();
        assert_eq!(value["type"], "span-update");
        assert_eq!(value["body"]["traceId"], trace.id.as_str());
        assert_eq!(value["body"]["output"], "done");
    }

    #[tokio::test]
    async fn test_full_queue_drops_events() {
        let config = LangfuseConfig {
            queue_capacity: 1,
            ..LangfuseConfig::default()
        };
        let (reporter, mut exporter) = LangfuseExporter::new(&config).unwrap();

        let trace = reporter.open_trace(&turn()).unwrap();
        assert!(reporter.open_span(&trace, "llm_call").is_ok());

        let queued = exporter.rx.try_recv().unwrap();
        assert_eq!(queued.kind, "trace-create");
        assert!(exporter.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reporter_fails_once_exporter_is_gone() {
        let (reporter, exporter) = LangfuseExporter::new(&LangfuseConfig::default()).unwrap();
        assert!(reporter.open_trace(&turn()).is_ok());

        drop(exporter);
        let err = reporter.open_trace(&turn()).unwrap_err();
        assert!(matches!(err, TraceError::ExporterClosed));
    }
}
