//! Process settings from environment variables (a `.env` file is loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;

pub const DEFAULT_BASE_URL: &str = "/api/main";

#[derive(Clone, Debug)]
pub struct Settings {
    /// PostgreSQL URL, or `memory://` for the in-memory store.
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Prefix for every route, without a trailing slash.
    pub base_url: String,
    pub max_connections: u32,
    pub body_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/entity_api".into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            base_url: DEFAULT_BASE_URL.into(),
            max_connections: 5,
            body_limit: 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);
        let bind_addr = parse_or("BIND_ADDR", &lookup, defaults.bind_addr)?;
        let base_url = lookup("API_BASE_URL")
            .map(|s| normalize_base_url(&s))
            .unwrap_or(defaults.base_url);
        let max_connections = parse_or("DB_MAX_CONNECTIONS", &lookup, defaults.max_connections)?;
        let body_limit = parse_or("BODY_LIMIT_BYTES", &lookup, defaults.body_limit)?;
        Ok(Settings {
            database_url,
            bind_addr,
            base_url,
            max_connections,
            body_limit,
        })
    }
}

fn parse_or<T>(var: &'static str, lookup: &impl Fn(&str) -> Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            var,
            message: e.to_string(),
        }),
    }
}

/// Leading slash, no trailing slash; empty means the root.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
