use std::time::Duration;

use anyhow::{Context, Result};

use crate::extraction::document::{DocumentLimits, DEFAULT_MAX_UPLOAD_BYTES};
use crate::provider::{ApiCredential, ProviderKind, ProviderSettings};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub provider: ProviderSettings,
    /// Used only when a request carries no credential of its own.
    pub fallback_api_key: Option<ApiCredential>,
    pub limits: DocumentLimits,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = get("EXTRACTION_PROVIDER")
            .unwrap_or_else(|| "anthropic".to_string())
            .parse::<ProviderKind>()?;

        Ok(Config {
            port: parse_or(&get, "PORT", 8080u16)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            provider: ProviderSettings {
                kind,
                model: non_empty(get("EXTRACTION_MODEL")),
                base_url: non_empty(get("EXTRACTION_BASE_URL")),
                request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 120)?),
                poll_interval: Duration::from_millis(parse_or(&get, "POLL_INTERVAL_MS", 1000)?),
                poll_timeout: Duration::from_secs(parse_or(&get, "POLL_TIMEOUT_SECS", 180)?),
            },
            fallback_api_key: get("EXTRACTION_API_KEY").and_then(ApiCredential::new),
            limits: DocumentLimits {
                max_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
