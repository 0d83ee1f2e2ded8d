//! Inbound webhook handling.
//!
//! # Data Flow
//! ```text
//! POST /webhook/teste.agente.codigo
//!     → InboundPayload (every field optional, non-strings ignored)
//!     → AgentTurn (defaults applied)
//!     → trace "whatsapp_agent" + span "llm_call"
//!     → reply = "Recebido: " + message
//!     → [optional] span "evolution_send" + gateway send
//!     → 200 {status, reply}  |  500 {error: "internal_error"}
//! ```

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::gateway::recipient_number;
use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::observability::{AgentTurn, TraceError, TraceHandle};

/// Route the gateway posts message events to.
pub const WEBHOOK_PATH: &str = "/webhook/teste.agente.codigo";

/// Identifier used when the payload names no user or message.
pub const UNKNOWN: &str = "unknown";

/// Message text used when the payload carries none.
pub const EMPTY_MESSAGE: &str = "";

/// Prefix of the echo reply.
pub const REPLY_PREFIX: &str = "Recebido: ";

pub const LLM_SPAN: &str = "llm_call";
pub const SEND_SPAN: &str = "evolution_send";

const SENDER: &str = "/sender";
const CONVERSATION: &str = "/data/message/conversation";
const REMOTE_JID: &str = "/data/key/remoteJid";
const MESSAGE_ID: &str = "/data/key/id";

/// Gateway message event.
///
/// No schema is enforced: a field that is missing, empty or not a JSON string
/// counts as absent.
#[derive(Debug, Clone, Default)]
pub struct InboundPayload {
    body: Value,
}

impl InboundPayload {
    /// Parse a raw body. An empty body or JSON `null` is an empty payload;
    /// only bytes that are not JSON fail.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(Self {
            body: serde_json::from_slice(body)?,
        })
    }

    fn text(&self, pointer: &str) -> Option<&str> {
        self.body
            .pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// `data.message.conversation`, or empty.
    pub fn message(&self) -> &str {
        self.text(CONVERSATION).unwrap_or(EMPTY_MESSAGE)
    }

    /// `sender`, then `data.key.remoteJid`, then `"unknown"`.
    pub fn user_id(&self) -> &str {
        self.text(SENDER)
            .or_else(|| self.text(REMOTE_JID))
            .unwrap_or(UNKNOWN)
    }

    /// `data.key.id`, or `"unknown"`.
    pub fn message_id(&self) -> &str {
        self.text(MESSAGE_ID).unwrap_or(UNKNOWN)
    }

    pub fn to_turn(&self) -> AgentTurn {
        AgentTurn {
            user_id: self.user_id().to_string(),
            input: self.message().to_string(),
            message_id: self.message_id().to_string(),
        }
    }
}

/// Echo reply for an inbound message.
pub fn compose_reply(message: &str) -> String {
    format!("{}{}", REPLY_PREFIX, message)
}

/// Outcome of delivering the reply through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: bool,
    pub error: Option<String>,
}

/// Successful webhook answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub reply: String,
    #[serde(flatten)]
    pub delivery: Option<DeliveryReport>,
}

/// Failure sources of the webhook handler.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("trace reporting failed: {0}")]
    Trace(#[from] TraceError),
}

/// `POST /webhook/teste.agente.codigo`
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);

    match handle_webhook(&state, &body).await {
        Ok(ack) => {
            tracing::info!(request_id = %request_id, delivered = ?ack.delivery.as_ref().map(|d| d.sent), "Webhook handled");
            metrics::record_webhook("ok", start);
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Webhook handling failed");
            metrics::record_webhook("error", start);
            ApiError::Internal.into_response()
        }
    }
}

/// Process one webhook body.
pub async fn handle_webhook(state: &AppState, body: &[u8]) -> Result<WebhookAck, WebhookError> {
    let payload = InboundPayload::from_slice(body)?;
    let turn = payload.to_turn();
    let reporter = state.reporter.as_ref();

    tracing::debug!(
        user_id = %turn.user_id,
        message_id = %turn.message_id,
        "Inbound message"
    );

    let trace = reporter.open_trace(&turn)?;
    let span = reporter.open_span(&trace, LLM_SPAN)?;
    let reply = compose_reply(&turn.input);
    reporter.close_span(span, Value::String(reply.clone()))?;

    let delivery = if state.config.evolution.send_replies {
        Some(deliver_reply(state, &trace, &turn.user_id, &reply).await?)
    } else {
        None
    };

    let sent = delivery.as_ref().is_some_and(|d| d.sent);
    reporter.close_trace(trace, json!({ "reply": reply, "sent": sent }))?;

    Ok(WebhookAck {
        status: "ok",
        reply,
        delivery,
    })
}

/// Send the reply through the gateway. A gateway failure is reported, not
/// propagated; only tracing failures abort the request.
async fn deliver_reply(
    state: &AppState,
    trace: &TraceHandle,
    user_id: &str,
    reply: &str,
) -> Result<DeliveryReport, TraceError> {
    let reporter = state.reporter.as_ref();
    let span = reporter.open_span(trace, SEND_SPAN)?;

    match state
        .gateway
        .send_text(recipient_number(user_id), reply, None)
        .await
    {
        Ok(body) => {
            reporter.close_span(span, body)?;
            Ok(DeliveryReport {
                sent: true,
                error: None,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "Reply delivery failed");
            let error = e.to_string();
            reporter.close_span(span, json!({ "error": error }))?;
            Ok(DeliveryReport {
                sent: false,
                error: Some(error),
            })
        }
    }
}
