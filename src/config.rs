use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;

/// Budget for a single upstream fetch, body included.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser user agent sent upstream; some feed hosts reject unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upstream_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment. Call once at startup.
    pub fn from_env() -> Result<Config> {
        dotenv().ok(); // Load .env file if present
        Ok(Config {
            port: parse_port(get_env_opt("PORT"))?,
            upstream_timeout: UPSTREAM_TIMEOUT,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            upstream_timeout: UPSTREAM_TIMEOUT,
        }
    }
}

pub fn parse_port(value: Option<String>) -> Result<u16> {
    match value {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u16>()
            .with_context(|| format!("PORT must be a valid port number, got {raw:?}")),
        _ => Ok(DEFAULT_PORT),
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok()
}
