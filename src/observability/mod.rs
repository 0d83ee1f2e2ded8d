//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Webhook handler produces:
//!     → trace.rs (TraceReporter seam: traces and spans per agent turn)
//!     → langfuse.rs (queued ingestion events, batched export)
//! ```
//!
//! # Design Decisions
//! - Trace export never blocks or fails the primary response path
//! - Without backend credentials the no-op reporter is installed

pub mod langfuse;
pub mod logging;
pub mod metrics;
pub mod trace;

pub use langfuse::{LangfuseExporter, LangfuseReporter};
pub use trace::{AgentTurn, NoopReporter, SpanHandle, TraceError, TraceHandle, TraceReporter};
