//! Evolution API client.
//!
//! # Responsibilities
//! - Send a text message through `POST {base}/message/sendText/{instance}`
//! - Authenticate with the `apikey` header
//! - Surface non-2xx answers and transport errors to the caller
//!
//! One call is one POST: no retry, no circuit breaking.

use std::time::Duration;

use serde_json::Value;

use crate::config::EvolutionConfig;
use crate::gateway::types::{GatewayError, GatewayResult, SendOptions, SendTextRequest};
use crate::observability::metrics;

/// Client for the gateway's send endpoint.
#[derive(Debug, Clone)]
pub struct EvolutionClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    instance: String,
}

impl EvolutionClient {
    /// Build a client from configuration. Empty settings are accepted here and
    /// reported when a send is attempted.
    pub fn new(config: &EvolutionConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            token: config.token.clone(),
            instance: config.instance.clone(),
        })
    }

    /// Full URL of the send-text endpoint.
    pub fn send_text_url(&self) -> GatewayResult<String> {
        if self.base_url.is_empty() {
            return Err(GatewayError::NotConfigured("EVOLUTION_API_BASE_URL"));
        }
        if self.instance.is_empty() {
            return Err(GatewayError::NotConfigured("EVOLUTION_INSTANCE"));
        }
        Ok(format!("{}/message/sendText/{}", self.base_url, self.instance))
    }

    /// Send `text` to `number`.
    ///
    /// Options default to `{linkPreview: true}`. Returns the upstream body as
    /// JSON; a non-JSON body comes back as a JSON string and an empty one as
    /// `null`. Every call records exactly one send outcome.
    pub async fn send_text(
        &self,
        number: &str,
        text: &str,
        options: Option<SendOptions>,
    ) -> GatewayResult<Value> {
        let result = self.post_text(number, text, options).await;
        match &result {
            Ok(_) => metrics::record_gateway_send("ok"),
            Err(e) => metrics::record_gateway_send(e.outcome()),
        }
        result
    }

    async fn post_text(
        &self,
        number: &str,
        text: &str,
        options: Option<SendOptions>,
    ) -> GatewayResult<Value> {
        let url = self.send_text_url()?;
        let body = SendTextRequest {
            number,
            text,
            options: options.unwrap_or_default(),
        };

        tracing::debug!(url = %url, number = %number, "Sending text through gateway");

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(_) => Ok(Value::String(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str, instance: &str) -> EvolutionConfig {
        EvolutionConfig {
            base_url: base_url.into(),
            token: "token".into(),
            instance: instance.into(),
            ..EvolutionConfig::default()
        }
    }

    #[test]
    fn test_send_text_url_trims_trailing_slash() {
        let client = EvolutionClient::new(&config("https://evo.example.com/", "main")).unwrap();
        assert_eq!(
            client.send_text_url().unwrap(),
            "https://evo.example.com/message/sendText/main"
        );
    }

    #[test]
    fn test_send_text_url_requires_settings() {
        let client = EvolutionClient::new(&config("", "main")).unwrap();
        assert!(matches!(
            client.send_text_url(),
            Err(GatewayError::NotConfigured("EVOLUTION_API_BASE_URL"))
        ));

        let client = EvolutionClient::new(&config("https://evo.example.com", "")).unwrap();
        assert!(matches!(
            client.send_text_url(),
            Err(GatewayError::NotConfigured("EVOLUTION_INSTANCE"))
        ));
    }
}
