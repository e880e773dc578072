use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub api_base_url: String,
    pub probe_path: String,

    // Remote calls and background loops
    pub request_timeout: Duration,
    pub probe_interval: Duration,
    pub sync_interval: Duration,
    pub gc_interval: Duration,
    pub outbox_retention_days: i64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: u64| parse_or(&lookup, key, default).map(Duration::from_secs);

        Ok(Self {
            database_url: text("DATABASE_URL", "sqlite://attendance.db"),
            api_base_url: text("API_BASE_URL", "http://localhost:8000/api"),
            probe_path: text("PROBE_PATH", "/test"),

            request_timeout: secs("REQUEST_TIMEOUT_SECS", 10)?, // remote request bound
            probe_interval: secs("PROBE_INTERVAL_SECS", 15)?,
            sync_interval: secs("SYNC_INTERVAL_SECS", 30)?,
            gc_interval: secs("GC_INTERVAL_SECS", 3600)?,
            outbox_retention_days: parse_or(&lookup, "OUTBOX_RETENTION_DAYS", 7)?,

            log_dir: text("LOG_DIR", "logs"),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::INFO)?,
        })
    }

    /// The probe lives next to the api prefix, not under it.
    pub fn probe_url(&self) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        let root = base.strip_suffix("/api").unwrap_or(base);
        format!("{}{}", root, self.probe_path)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
