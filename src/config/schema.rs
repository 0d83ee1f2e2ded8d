//! Configuration schema definitions.
//!
//! Every section derives Serde traits so the same structure can be read from an
//! optional TOML base file before environment variables are applied on top.

use serde::{Deserialize, Serialize};

/// Port used when `PORT` is unset or unparsable.
pub const DEFAULT_PORT: u16 = 5678;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listen port.
    pub port: u16,

    /// Language-model API key. Only reported when missing; nothing calls the
    /// model, the reply is a fixed echo.
    pub openai_api_key: String,

    /// Messaging gateway (Evolution API) settings.
    pub evolution: EvolutionConfig,

    /// Trace backend (Langfuse) settings.
    pub langfuse: LangfuseConfig,

    /// HTTP server limits and optional routes.
    pub server: ServerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            openai_api_key: String::new(),
            evolution: EvolutionConfig::default(),
            langfuse: LangfuseConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Evolution API gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Base URL, e.g. "https://evolution.example.com".
    pub base_url: String,

    /// Value sent in the `apikey` header.
    pub token: String,

    /// Instance name appended to the send path.
    pub instance: String,

    /// Deliver the computed reply through the gateway from the webhook handler.
    pub send_replies: bool,

    /// Timeout for a single send call in seconds.
    pub timeout_secs: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            instance: String::new(),
            send_replies: false,
            timeout_secs: 15,
        }
    }
}

/// Langfuse trace backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LangfuseConfig {
    pub public_key: String,
    pub secret_key: String,

    /// Backend URL. Empty means the hosted cloud endpoint.
    pub host: String,

    /// Maximum time an event waits in the export queue.
    pub flush_interval_ms: u64,

    /// Number of queued events that forces an early flush.
    pub batch_size: usize,

    /// Events held while the backend is slow; further events are dropped.
    pub queue_capacity: usize,
}

impl Default for LangfuseConfig {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            secret_key: String::new(),
            host: String::new(),
            flush_interval_ms: 1000,
            batch_size: 50,
            queue_capacity: 10_000,
        }
    }
}

impl LangfuseConfig {
    /// Both keys are required to authenticate against the ingestion API.
    pub fn is_enabled(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Total time allowed for one request in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,

    /// Expose `/debug/trace`.
    pub debug_routes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
            debug_routes: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus scrape listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "whatsapp_relay=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
