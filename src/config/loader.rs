//! Configuration loading from the environment and an optional TOML file.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{LogFormat, RelayConfig};

/// Names a TOML file whose contents become the base configuration.
pub const CONFIG_FILE_ENV: &str = "RELAY_CONFIG_FILE";

/// Error type for reading the base configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Non-fatal problem found while resolving the configuration.
#[derive(Debug, Error)]
pub enum ConfigWarning {
    #[error("config file {path} ignored: {source}")]
    File {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("invalid value {value:?} for {key}, keeping {fallback}")]
    InvalidValue {
        key: &'static str,
        value: String,
        fallback: String,
    },
}

/// Read and parse a TOML configuration file.
pub fn load_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RelayConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load `.env` (if present) and resolve the configuration from the process
/// environment.
pub fn load_from_env() -> (RelayConfig, Vec<ConfigWarning>) {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

/// Resolve the configuration from a key lookup.
///
/// Empty values count as unset. Unparsable values keep the previous value and
/// produce a warning; resolution itself never fails.
pub fn load_from<F>(lookup: F) -> (RelayConfig, Vec<ConfigWarning>)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    let mut warnings = Vec::new();

    let mut config = match get(CONFIG_FILE_ENV) {
        Some(path) => match load_file(Path::new(&path)) {
            Ok(config) => config,
            Err(source) => {
                warnings.push(ConfigWarning::File { path, source });
                RelayConfig::default()
            }
        },
        None => RelayConfig::default(),
    };

    parse_into(&mut config.port, "PORT", get("PORT"), &mut warnings);

    set_string(&mut config.openai_api_key, get("OPENAI_API_KEY"));
    set_string(&mut config.evolution.base_url, get("EVOLUTION_API_BASE_URL"));
    set_string(&mut config.evolution.token, get("EVOLUTION_API_TOKEN"));
    set_string(&mut config.evolution.instance, get("EVOLUTION_INSTANCE"));
    set_string(&mut config.langfuse.public_key, get("LANGFUSE_PUBLIC_KEY"));
    set_string(&mut config.langfuse.secret_key, get("LANGFUSE_SECRET_KEY"));
    set_string(&mut config.langfuse.host, get("LANGFUSE_HOST"));

    parse_flag(
        &mut config.evolution.send_replies,
        "EVOLUTION_SEND_REPLIES",
        get("EVOLUTION_SEND_REPLIES"),
        &mut warnings,
    );
    parse_into(
        &mut config.evolution.timeout_secs,
        "EVOLUTION_TIMEOUT_SECS",
        get("EVOLUTION_TIMEOUT_SECS"),
        &mut warnings,
    );
    parse_into(
        &mut config.langfuse.flush_interval_ms,
        "LANGFUSE_FLUSH_INTERVAL_MS",
        get("LANGFUSE_FLUSH_INTERVAL_MS"),
        &mut warnings,
    );
    parse_into(
        &mut config.langfuse.batch_size,
        "LANGFUSE_BATCH_SIZE",
        get("LANGFUSE_BATCH_SIZE"),
        &mut warnings,
    );
    parse_into(
        &mut config.langfuse.queue_capacity,
        "LANGFUSE_QUEUE_CAPACITY",
        get("LANGFUSE_QUEUE_CAPACITY"),
        &mut warnings,
    );
    parse_into(
        &mut config.server.request_timeout_secs,
        "REQUEST_TIMEOUT_SECS",
        get("REQUEST_TIMEOUT_SECS"),
        &mut warnings,
    );
    parse_into(
        &mut config.server.body_limit_bytes,
        "BODY_LIMIT_BYTES",
        get("BODY_LIMIT_BYTES"),
        &mut warnings,
    );
    parse_flag(
        &mut config.server.debug_routes,
        "RELAY_DEBUG_ROUTES",
        get("RELAY_DEBUG_ROUTES"),
        &mut warnings,
    );

    set_string(&mut config.observability.log_filter, get("RUST_LOG"));
    if let Some(raw) = get("LOG_FORMAT") {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => config.observability.log_format = LogFormat::Json,
            "pretty" | "text" => config.observability.log_format = LogFormat::Pretty,
            _ => warnings.push(ConfigWarning::InvalidValue {
                key: "LOG_FORMAT",
                value: raw,
                fallback: format!("{:?}", config.observability.log_format).to_lowercase(),
            }),
        }
    }
    parse_flag(
        &mut config.observability.metrics_enabled,
        "METRICS_ENABLED",
        get("METRICS_ENABLED"),
        &mut warnings,
    );
    set_string(
        &mut config.observability.metrics_address,
        get("METRICS_ADDRESS"),
    );

    (config, warnings)
}

fn set_string(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_into<T>(
    slot: &mut T,
    key: &'static str,
    raw: Option<String>,
    warnings: &mut Vec<ConfigWarning>,
) where
    T: FromStr + fmt::Display,
{
    let Some(raw) = raw else { return };
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(_) => warnings.push(ConfigWarning::InvalidValue {
            key,
            value: raw,
            fallback: slot.to_string(),
        }),
    }
}

fn parse_flag(
    slot: &mut bool,
    key: &'static str,
    raw: Option<String>,
    warnings: &mut Vec<ConfigWarning>,
) {
    let Some(raw) = raw else { return };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => *slot = true,
        "0" | "false" | "no" | "off" => *slot = false,
        _ => warnings.push(ConfigWarning::InvalidValue {
            key,
            value: raw,
            fallback: slot.to_string(),
        }),
    }
}
