//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use whatsapp_relay::config::RelayConfig;
use whatsapp_relay::observability::{
    AgentTurn, SpanHandle, TraceError, TraceHandle, TraceReporter,
};
use whatsapp_relay::AppState;

pub const BODY_LIMIT: usize = 1024 * 1024;

/// A request captured by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct BackendState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// In-process HTTP backend answering every request with a fixed response.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Poll until at least `count` requests arrived or the timeout passes.
    pub async fn wait_for_requests(&self, count: usize, timeout: Duration) -> Vec<RecordedRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let requests = self.requests();
            if requests.len() >= count || tokio::time::Instant::now() >= deadline {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

async fn record(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body).into_response()
}

/// Start a mock backend on an ephemeral port.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_slow_mock_backend(status, body, Duration::ZERO).await
}

/// Start a mock backend that records each request immediately and answers
/// after `delay`.
pub async fn start_slow_mock_backend(
    status: u16,
    body: &'static str,
    delay: Duration,
) -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        status: StatusCode::from_u16(status).unwrap(),
        body,
        delay,
        requests: requests.clone(),
    };
    let app = Router::new().fallback(record).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, requests }
}

/// Trace call captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    TraceOpened(AgentTurn),
    SpanOpened(String),
    SpanClosed(String, Value),
    TraceClosed(Value),
}

/// Reporter that keeps every call in memory.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<TraceEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn opened_turn(&self) -> Option<AgentTurn> {
        self.events().into_iter().find_map(|e| match e {
            TraceEvent::TraceOpened(turn) => Some(turn),
            _ => None,
        })
    }

    fn push(&self, event: TraceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl TraceReporter for RecordingReporter {
    fn open_trace(&self, turn: &AgentTurn) -> Result<TraceHandle, TraceError> {
        self.push(TraceEvent::TraceOpened(turn.clone()));
        Ok(TraceHandle::new("whatsapp_agent"))
    }

    fn open_span(&self, trace: &TraceHandle, name: &str) -> Result<SpanHandle, TraceError> {
        self.push(TraceEvent::SpanOpened(name.to_string()));
        Ok(SpanHandle::new(trace, name))
    }

    fn close_span(&self, span: SpanHandle, output: Value) -> Result<(), TraceError> {
        self.push(TraceEvent::SpanClosed(span.name, output));
        Ok(())
    }

    fn close_trace(&self, _trace: TraceHandle, output: Value) -> Result<(), TraceError> {
        self.push(TraceEvent::TraceClosed(output));
        Ok(())
    }
}

/// Reporter whose backend is always down.
pub struct FailingReporter;

impl TraceReporter for FailingReporter {
    fn open_trace(&self, _turn: &AgentTurn) -> Result<TraceHandle, TraceError> {
        Err(TraceError::Unavailable("backend down".into()))
    }

    fn open_span(&self, _trace: &TraceHandle, _name: &str) -> Result<SpanHandle, TraceError> {
        Err(TraceError::Unavailable("backend down".into()))
    }

    fn close_span(&self, _span: SpanHandle, _output: Value) -> Result<(), TraceError> {
        Err(TraceError::Unavailable("backend down".into()))
    }

    fn close_trace(&self, _trace: TraceHandle, _output: Value) -> Result<(), TraceError> {
        Err(TraceError::Unavailable("backend down".into()))
    }
}

/// Reporter that panics, standing in for a bug inside the handler.
pub struct PanickingReporter;

impl TraceReporter for PanickingReporter {
    fn open_trace(&self, _turn: &AgentTurn) -> Result<TraceHandle, TraceError> {
        panic!("reporter exploded");
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

/// Build handler state around a config and reporter.
pub fn app_state(config: RelayConfig, reporter: Arc<dyn TraceReporter>) -> AppState {
    AppState::new(Arc::new(config), reporter).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
