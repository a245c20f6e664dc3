use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    /// Absent key degrades insights to the placeholder report instead of
    /// failing startup; the statistical pipeline does not need it.
    pub openai_api_key: Option<String>,
    pub insight_model: String,
    pub max_upload_bytes: usize,
    pub insight_timeout: Duration,
    pub dataset_cache_capacity: u64,
    pub dataset_ttl: Duration,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Ok(Config {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            insight_model: std::env::var("INSIGHT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            insight_timeout: Duration::from_secs(env_parse("INSIGHT_TIMEOUT_SECS", 30)?),
            dataset_cache_capacity: env_parse("DATASET_CACHE_CAPACITY", 64)?,
            dataset_ttl: Duration::from_secs(env_parse("DATASET_TTL_SECS", 3600)?),
            port: env_parse("PORT", 3000)?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}
