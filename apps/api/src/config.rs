use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Where uploaded letters are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBackend {
    Local {
        upload_path: String,
    },
    S3 {
        bucket: String,
        endpoint: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub blob_backend: BlobBackend,
    pub llm_timeout: Duration,
    pub transaction_timeout: Duration,
    pub request_timeout: Duration,
    pub ai_requests_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let blob_backend = match lookup("S3_BUCKET").filter(|v| !v.trim().is_empty()) {
            Some(bucket) => BlobBackend::S3 {
                bucket,
                endpoint: require("S3_ENDPOINT")?,
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            },
            None => BlobBackend::Local {
                upload_path: lookup("UPLOAD_PATH").unwrap_or_else(|| "./uploads".to_string()),
            },
        };

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            blob_backend,
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 30)?),
            transaction_timeout: Duration::from_secs(parse_or(
                &lookup,
                "TRANSACTION_TIMEOUT_SECS",
                60,
            )?),
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 90)?),
            ai_requests_per_minute: parse_or(&lookup, "AI_REQUESTS_PER_MINUTE", 10)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
