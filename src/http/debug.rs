//! Diagnostic routes, mounted only when `RELAY_DEBUG_ROUTES` is set.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::{AgentTurn, TraceError};

pub const DEBUG_TRACE_PATH: &str = "/debug/trace";

/// `GET /debug/trace`: push a ping/pong trace through the reporter so the
/// backend wiring can be checked without a gateway.
pub async fn debug_trace(State(state): State<AppState>) -> Response {
    match ping_trace(&state) {
        Ok(trace_id) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "trace_id": trace_id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Debug trace failed");
            ApiError::Internal.into_response()
        }
    }
}

fn ping_trace(state: &AppState) -> Result<String, TraceError> {
    let reporter = state.reporter.as_ref();
    let turn = AgentTurn {
        user_id: "debug-user".into(),
        input: "ping".into(),
        message_id: "debug-msg".into(),
    };

    let trace = reporter.open_trace(&turn)?;
    let span = reporter.open_span(&trace, "ping")?;
    reporter.close_span(span, Value::from("pong"))?;

    let trace_id = trace.id.clone();
    reporter.close_trace(trace, json!({ "ok": true }))?;
    Ok(trace_id)
}
