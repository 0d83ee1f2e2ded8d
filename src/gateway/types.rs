//! Gateway request types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Options accepted by the send-text endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { link_preview: true }
    }
}

/// Body of `POST /message/sendText/{instance}`.
#[derive(Debug, Clone, Serialize)]
pub struct SendTextRequest<'a> {
    pub number: &'a str,
    pub text: &'a str,
    pub options: SendOptions,
}

/// Errors that can occur while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A setting the call depends on is empty.
    #[error("gateway not configured: {0} is empty")]
    NotConfigured(&'static str),

    /// Connection, timeout or body read failure.
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer.
    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl GatewayError {
    /// Metric label for the failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Transport(_) => "transport_error",
            Self::Status { .. } => "rejected",
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Phone number part of a WhatsApp JID (`5511999999999@s.whatsapp.net`).
pub fn recipient_number(user_id: &str) -> &str {
    user_id.split('@').next().unwrap_or(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_enable_link_preview() {
        let value = serde_json::to_value(SendOptions::default()).unwrap();
        assert_eq!(value, serde_json::json!({ "linkPreview": true }));
    }

    #[test]
    fn test_recipient_number() {
        assert_eq!(recipient_number("5511999999999@s.whatsapp.net"), "5511999999999");
        assert_eq!(recipient_number("5511999999999"), "5511999999999");
        assert_eq!(recipient_number(""), "");
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::Status {
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(err.to_string(), "gateway returned 401: unauthorized");

        let err = GatewayError::NotConfigured("EVOLUTION_API_BASE_URL");
        assert!(err.to_string().contains("EVOLUTION_API_BASE_URL"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(GatewayError::NotConfigured("EVOLUTION_INSTANCE").outcome(), "not_configured");
        let err = GatewayError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.outcome(), "rejected");
    }
}
