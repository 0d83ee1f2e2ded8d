//! Startup orchestration.
//!
//! # Responsibilities
//! - Report configuration problems (never fatal)
//! - Initialize subsystems in dependency order: metrics, trace reporter,
//!   gateway client, HTTP state
//! - Serve until shutdown, drain in-flight requests, then flush the trace
//!   exporter
//!
//! # Design Decisions
//! - Only bind and serve errors stop the process
//! - Without Langfuse keys the no-op reporter is installed

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{
    warn_invalid_urls, warn_missing, ConfigWarning, LangfuseConfig, ObservabilityConfig,
    RelayConfig,
};
use crate::gateway::GatewayError;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::{metrics, LangfuseExporter, NoopReporter, TraceError, TraceReporter};

/// Errors that stop startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("gateway client: {0}")]
    Gateway(#[from] GatewayError),

    #[error("trace reporter: {0}")]
    Trace(#[from] TraceError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

/// Running trace exporter and the signal that stops it.
///
/// The exporter has its own stop signal so requests still draining after the
/// server shutdown can keep reporting.
pub struct ExporterTask {
    stop: Shutdown,
    handle: JoinHandle<()>,
}

impl ExporterTask {
    /// Stop the exporter and wait for its final flush.
    pub async fn finish(self) {
        self.stop.trigger();
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Trace exporter task failed");
        }
    }
}

/// Initialized relay, ready to serve.
pub struct Relay {
    pub state: AppState,
    exporter: Option<ExporterTask>,
}

impl Relay {
    /// Address the relay listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.state.config.port))
    }
}

/// Log loader warnings and missing settings.
pub fn report_config(config: &RelayConfig, warnings: &[ConfigWarning]) {
    for warning in warnings {
        tracing::warn!("{}", warning);
    }
    warn_missing(config);
    warn_invalid_urls(config);

    tracing::info!(
        port = config.port,
        send_replies = config.evolution.send_replies,
        tracing_enabled = config.langfuse.is_enabled(),
        debug_routes = config.server.debug_routes,
        "Configuration loaded"
    );
}

/// Install the Prometheus exporter when enabled. Failures are logged only.
pub fn init_metrics(config: &ObservabilityConfig) {
    if !config.metrics_enabled {
        return;
    }
    match config.metrics_address.parse() {
        Ok(addr) => {
            if let Err(e) = metrics::init_metrics(addr) {
                tracing::error!(error = %e, "Failed to install metrics exporter");
            }
        }
        Err(_) => {
            tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }
}

/// Pick the trace reporter. Must run inside a Tokio runtime.
pub fn build_reporter(
    config: &LangfuseConfig,
) -> Result<(Arc<dyn TraceReporter>, Option<ExporterTask>), TraceError> {
    if !config.is_enabled() {
        tracing::info!("Langfuse keys not set, traces are not exported");
        return Ok((Arc::new(NoopReporter), None));
    }

    let (reporter, exporter) = LangfuseExporter::new(config)?;
    let stop = Shutdown::new();
    let handle = exporter.spawn(stop.subscribe());
    Ok((Arc::new(reporter), Some(ExporterTask { stop, handle })))
}

/// Build every subsystem from the configuration.
pub fn prepare(config: RelayConfig) -> Result<Relay, StartupError> {
    let (reporter, exporter) = build_reporter(&config.langfuse)?;
    let state = AppState::new(Arc::new(config), reporter)?;
    Ok(Relay { state, exporter })
}

/// Serve until shutdown, drain in-flight requests, then flush the trace
/// exporter.
pub async fn serve(
    relay: Relay,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    let server = HttpServer::new(relay.state);
    let result = server.run(listener, shutdown.subscribe()).await;

    if let Some(exporter) = relay.exporter {
        exporter.finish().await;
    }

    result.map_err(StartupError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::AgentTurn;

    #[tokio::test]
    async fn test_noop_reporter_without_keys() {
        let (_, exporter) = build_reporter(&LangfuseConfig::default()).unwrap();
        assert!(exporter.is_none());
    }

    #[tokio::test]
    async fn test_exporter_ignores_server_shutdown() {
        let server_shutdown = Shutdown::new();
        let config = LangfuseConfig {
            public_key: "pk".into(),
            secret_key: "sk".into(),
            host: "http://127.0.0.1:9".into(),
            ..LangfuseConfig::default()
        };
        let (reporter, exporter) = build_reporter(&config).unwrap();
        let exporter = exporter.unwrap();
        assert_eq!(server_shutdown.receiver_count(), 0);

        server_shutdown.trigger();
        tokio::task::yield_now().await;
        assert!(!exporter.handle.is_finished());
        let turn = AgentTurn {
            user_id: "u".into(),
            input: "oi".into(),
            message_id: "m".into(),
        };
        assert!(reporter.open_trace(&turn).is_ok());

        exporter.finish().await;
    }

    #[tokio::test]
    async fn test_prepare_with_empty_config() {
        let relay = prepare(RelayConfig::default()).unwrap();
        assert_eq!(relay.listen_addr().port(), 5678);
    }
}
