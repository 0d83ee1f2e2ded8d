//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → health.rs | webhook.rs | debug.rs (handlers)
//!     → response.rs (generic error body)
//!     → Send to client
//! ```

pub mod debug;
pub mod health;
pub mod request;
pub mod response;
pub mod server;
pub mod webhook;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{build_router, AppState, HttpServer};
pub use webhook::{InboundPayload, WebhookAck, WEBHOOK_PATH};
