use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::prompts::{fill_prompt, CREDIBILITY_PROMPT, PROFILE_DATA_PROMPT, TAILOR_PROMPT};
use super::{CredibilityFacts, LlmProvider, ProfileFacts, ProviderError, TailorOutcome};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::LlmClient;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TailorReply {
    summary: String,
    #[serde(rename = "matchScore")]
    match_score: f64,
}

/// Live provider backed by Claude.
#[derive(Clone)]
pub struct ClaudeProvider {
    client: LlmClient,
    timeout: Duration,
}

impl ClaudeProvider {
    /// `timeout` caps each operation including retries.
    pub fn new(client: LlmClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn run<T>(
        &self,
        operation: &'static str,
        prompt: String,
        cancel: &CancellationToken,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + Send,
    {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        debug!(operation, prompt_chars = prompt.len(), "Calling model");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            reply = tokio::time::timeout(
                self.timeout,
                self.client.call_json::<T>(&prompt, JSON_ONLY_SYSTEM),
            ) => match reply {
                Ok(decoded) => decoded.map_err(ProviderError::from),
                Err(_) => Err(ProviderError::Timeout(self.timeout)),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn extract_profile_data(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ProfileFacts, ProviderError> {
        let prompt = fill_prompt(
            PROFILE_DATA_PROMPT,
            &[("no_invention", NO_INVENTION_INSTRUCTION), ("letter_text", text)],
        );
        self.run("extract_profile_data", prompt, cancel).await
    }

    async fn extract_credibility(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CredibilityFacts, ProviderError> {
        let prompt = fill_prompt(
            CREDIBILITY_PROMPT,
            &[("no_invention", NO_INVENTION_INSTRUCTION), ("letter_text", text)],
        );
        self.run("extract_credibility", prompt, cancel).await
    }

    async fn tailor(
        &self,
        profile_text: &str,
        job_description: &str,
        cancel: &CancellationToken,
    ) -> Result<TailorOutcome, ProviderError> {
        let prompt = fill_prompt(
            TAILOR_PROMPT,
            &[
                ("profile_text", profile_text),
                ("job_description", job_description),
            ],
        );
        let reply: TailorReply = self.run("tailor", prompt, cancel).await?;
        Ok(TailorOutcome {
            summary: reply.summary,
            score: reply.match_score,
        })
    }
}
