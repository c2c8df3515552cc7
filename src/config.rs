// config.rs
// Environment-driven settings. `.env` is loaded by main before this runs.

use anyhow::{Context, Result};
use std::{env, net::SocketAddr, str::FromStr, time::Duration};

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60 * 24; // 1 day

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub bind_addr: SocketAddr,
    pub session_ttl_seconds: u64,
    /// Run multi-document writes inside a MongoDB transaction (needs a replica set).
    pub use_transactions: bool,
    pub server_selection_timeout: Duration,
    pub seed_users_file: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(AppConfig {
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: var_or("MONGODB_DB", "buildingdesk"),
            bind_addr: parse_var("BIND_ADDR", "0.0.0.0:8080")?,
            session_ttl_seconds: parse_var(
                "SESSION_TTL_SECONDS",
                &DEFAULT_SESSION_TTL_SECONDS.to_string(),
            )?,
            use_transactions: parse_bool_var("MONGODB_TRANSACTIONS", false)?,
            server_selection_timeout: Duration::from_millis(parse_var(
                "MONGODB_SERVER_SELECTION_TIMEOUT_MS",
                "5000",
            )?),
            seed_users_file: var_or("SEED_USERS_FILE", "./data/users.json"),
            log_format: match var_or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = var_or(key, default);
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("invalid value for {key}: {raw:?}"))
}

fn parse_bool_var(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw).with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}
