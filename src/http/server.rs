//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the health, webhook and debug handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit, panic guard)
//! - Serve on a listener until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::RelayConfig;
use crate::gateway::{EvolutionClient, GatewayError};
use crate::http::debug::{debug_trace, DEBUG_TRACE_PATH};
use crate::http::health::health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::panic_response;
use crate::http::webhook::{receive_webhook, WEBHOOK_PATH};
use crate::observability::TraceReporter;

/// Application state injected into handlers. Shared read-only.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub reporter: Arc<dyn TraceReporter>,
    pub gateway: Arc<EvolutionClient>,
}

impl AppState {
    /// Build the state, creating the gateway client from configuration.
    pub fn new(
        config: Arc<RelayConfig>,
        reporter: Arc<dyn TraceReporter>,
    ) -> Result<Self, GatewayError> {
        let gateway = Arc::new(EvolutionClient::new(&config.evolution)?);
        Ok(Self {
            config,
            reporter,
            gateway,
        })
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let server = state.config.server.clone();

    let mut router = Router::new()
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(receive_webhook));

    if server.debug_routes {
        router = router.route(DEBUG_TRACE_PATH, get(debug_trace));
    }

    router
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Run the server until a shutdown signal is broadcast.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
