//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional, dotenvy)
//!     → RELAY_CONFIG_FILE (optional TOML base)
//!     → process environment (overrides)
//!     → loader.rs (resolve, collect warnings)
//!     → validation.rs (report missing settings)
//!     → RelayConfig (immutable)
//!     → shared via Arc to the server, gateway and trace reporter
//! ```
//!
//! # Design Decisions
//! - Resolution never fails; bad values fall back to defaults with a warning
//! - Missing secrets are a run-time risk, reported once at startup
//! - Loading is a pure function of a key lookup, so tests use fake environments

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from, load_from_env, ConfigWarning};
pub use schema::{
    EvolutionConfig, LangfuseConfig, LogFormat, ObservabilityConfig, RelayConfig, ServerConfig,
};
pub use validation::{invalid_urls, missing_settings, warn_invalid_urls, warn_missing};
