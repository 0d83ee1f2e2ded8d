//! Startup check for unset settings.
//!
//! Missing values never abort startup. A request that depends on one fails
//! when the dependent call is made.

use url::Url;

use crate::config::schema::RelayConfig;

/// Environment names of the settings that have no usable default, paired with
/// their resolved values.
fn required_settings(config: &RelayConfig) -> [(&'static str, &str); 7] {
    [
        ("OPENAI_API_KEY", config.openai_api_key.as_str()),
        ("EVOLUTION_API_BASE_URL", config.evolution.base_url.as_str()),
        ("EVOLUTION_API_TOKEN", config.evolution.token.as_str()),
        ("EVOLUTION_INSTANCE", config.evolution.instance.as_str()),
        ("LANGFUSE_PUBLIC_KEY", config.langfuse.public_key.as_str()),
        ("LANGFUSE_SECRET_KEY", config.langfuse.secret_key.as_str()),
        ("LANGFUSE_HOST", config.langfuse.host.as_str()),
    ]
}

/// Names of the settings whose value is empty, in declaration order.
///
/// `PORT` always resolves to a value and is never reported.
pub fn missing_settings(config: &RelayConfig) -> Vec<&'static str> {
    required_settings(config)
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}

/// Emit a single warning line naming every missing setting.
///
/// Returns the names so callers can act on them.
pub fn warn_missing(config: &RelayConfig) -> Vec<&'static str> {
    let missing = missing_settings(config);
    if !missing.is_empty() {
        tracing::warn!("missing envs: {}", missing.join(", "));
    }
    missing
}

/// Names of URL settings that are set but not absolute http(s) URLs.
pub fn invalid_urls(config: &RelayConfig) -> Vec<&'static str> {
    [
        ("EVOLUTION_API_BASE_URL", config.evolution.base_url.as_str()),
        ("LANGFUSE_HOST", config.langfuse.host.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| !value.trim().is_empty())
    .filter(|(_, value)| {
        !matches!(Url::parse(value.trim()), Ok(url) if matches!(url.scheme(), "http" | "https"))
    })
    .map(|(name, _)| name)
    .collect()
}

/// Warn about URL settings that will make dependent calls fail.
pub fn warn_invalid_urls(config: &RelayConfig) -> Vec<&'static str> {
    let invalid = invalid_urls(config);
    if !invalid.is_empty() {
        tracing::warn!("invalid URLs in: {}", invalid.join(", "));
    }
    invalid
}
