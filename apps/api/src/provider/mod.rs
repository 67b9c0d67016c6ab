//! The language-model capability used by the pipelines.
//!
//! Three operations, each with a strict JSON contract. Implementations
//! return fully decoded values or an error, never partial data.

pub mod cache;
pub mod claude;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::llm_client::LlmError;
use crate::models::Sentiment;

pub use cache::CachedProvider;
pub use claude::ClaudeProvider;

/// Facts about one role, as read from a letter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileFacts {
    pub company_name: String,
    pub role: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`, or empty for a current role. `null` is read as empty.
    #[serde(deserialize_with = "null_as_empty")]
    pub end_date: String,
    pub skills: Vec<String>,
    pub achievements: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredibilityFacts {
    pub quotes: Vec<String>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TailorOutcome {
    pub summary: String,
    /// Unchecked; callers clamp and validate.
    pub score: f64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("model request failed: {0}")]
    Transport(#[source] LlmError),

    #[error("model reply violated the schema: {0}")]
    Schema(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model call cancelled")]
    Cancelled,

    #[error("model call failed: {0}")]
    Failed(String),
}

impl From<LlmError> for ProviderError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Parse(e) => ProviderError::Schema(e.to_string()),
            LlmError::EmptyContent => ProviderError::Schema(err.to_string()),
            other => ProviderError::Transport(other),
        }
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn extract_profile_data(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ProfileFacts, ProviderError>;

    async fn extract_credibility(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CredibilityFacts, ProviderError>;

    async fn tailor(
        &self,
        profile_text: &str,
        job_description: &str,
        cancel: &CancellationToken,
    ) -> Result<TailorOutcome, ProviderError>;
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
