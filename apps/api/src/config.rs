use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::occupations::client::OnetClientConfig;
use crate::occupations::manager::DEFAULT_BATCH_SIZE;

/// Accepted OCCUPATION_CACHE_TTL_DAYS values.
const CACHE_TTL_DAYS: RangeInclusive<i64> = 1..=3650;

/// Application configuration loaded from environment variables.
/// Every variable has a default; startup fails only on malformed values.
#[derive(Debug, Clone)]
pub struct Config {
    /// In-memory caches are used when unset.
    pub database_url: Option<String>,
    /// Roadmap narration falls back to template text when unset.
    pub anthropic_api_key: Option<String>,
    pub onet_base_url: String,
    pub onet_username: Option<String>,
    pub onet_password: Option<String>,
    pub onet_min_interval_ms: u64,
    pub onet_timeout_secs: u64,
    /// Concurrent remote fetches per batch lookup.
    pub onet_batch_size: usize,
    pub occupation_cache_ttl_days: i64,
    pub analysis_cache_retention: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            onet_base_url: std::env::var("ONET_BASE_URL")
                .unwrap_or_else(|_| OnetClientConfig::default().base_url),
            onet_username: optional_env("ONET_USERNAME"),
            onet_password: optional_env("ONET_PASSWORD"),
            onet_min_interval_ms: parse_env("ONET_MIN_INTERVAL_MS", 200)?,
            onet_timeout_secs: parse_env("ONET_TIMEOUT_SECS", 10)?,
            onet_batch_size: parse_env("ONET_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            occupation_cache_ttl_days: parse_env_in("OCCUPATION_CACHE_TTL_DAYS", 30, CACHE_TTL_DAYS)?,
            analysis_cache_retention: parse_env("ANALYSIS_CACHE_RETENTION", 5)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn onet_client_config(&self) -> OnetClientConfig {
        OnetClientConfig {
            base_url: self.onet_base_url.clone(),
            username: self.onet_username.clone(),
            password: self.onet_password.clone(),
            min_interval: Duration::from_millis(self.onet_min_interval_ms),
            timeout: Duration::from_secs(self.onet_timeout_secs),
        }
    }

    pub fn occupation_cache_ttl(&self) -> chrono::Duration {
        let days = self
            .occupation_cache_ttl_days
            .clamp(*CACHE_TTL_DAYS.start(), *CACHE_TTL_DAYS.end());
        chrono::Duration::try_days(days).unwrap_or_else(chrono::Duration::zero)
    }
}

/// Unset and blank are the same thing.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}

fn parse_env_in<T>(key: &str, default: T, range: RangeInclusive<T>) -> Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse_env(key, default)?;
    if !range.contains(&value) {
        bail!(
            "{key} must be between {} and {} (got {value})",
            range.start(),
            range.end()
        );
    }
    Ok(value)
}
