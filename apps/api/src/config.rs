use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::retry::RetryPolicy;

const DEFAULT_LLM_API_URL: &str = "https://api.x.ai/v1/chat/completions";
const DEFAULT_LLM_MODEL: &str = "grok-3-mini";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm_api_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub port: u16,
    pub rust_log: String,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Per-attempt timeout for outbound calls. 0 disables it.
    pub retry_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_API_URL.to_string()),
            llm_api_key: require_env("LLM_API_KEY")?,
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", 500)?,
            retry_max_delay_ms: env_or("RETRY_MAX_DELAY_MS", 4000)?,
            retry_timeout_ms: env_or("RETRY_TIMEOUT_MS", 30_000)?,
        })
    }

    /// The policy every outbound call in the service runs under.
    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        );
        match self.retry_timeout_ms {
            0 => policy.without_timeout(),
            ms => policy.with_timeout(Duration::from_millis(ms)),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/cvforge_test".to_string(),
        llm_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        llm_api_key: "test-key".to_string(),
        llm_model: "test-model".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 1,
        retry_timeout_ms: 1000,
    }
}
