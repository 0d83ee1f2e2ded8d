//! WhatsApp webhook relay.
//!
//! Receives message events from an Evolution API gateway, reports each one as
//! a trace to Langfuse, answers with an echo reply and can deliver that reply
//! back through the gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Gateway webhook            ┌──────────────────────────────────────────────┐
//!     ───────────────────────────┼─▶ http::server ──▶ http::webhook            │
//!                                │                       │        │             │
//!                                │                       ▼        ▼             │
//!                                │        observability::trace   gateway        │
//!                                │                │           (optional send)──┼──▶ Evolution API
//!                                │                ▼                             │
//!                                │     observability::langfuse ─────────────────┼──▶ Langfuse
//!                                │                                              │
//!                                │  config · lifecycle · logging · metrics      │
//!                                └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use http::{build_router, AppState, HttpServer};
pub use lifecycle::Shutdown;
