use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CredibilityFacts, LlmProvider, ProfileFacts, ProviderError, TailorOutcome};
use crate::fingerprint::sha256_hex;

#[derive(Debug, Clone)]
enum CachedValue {
    Profile(ProfileFacts),
    Credibility(CredibilityFacts),
    Tailor(TailorOutcome),
}

/// Memoizes successful provider results for the life of the process.
///
/// Errors are never stored. Two callers racing on the same key may both
/// reach the inner provider; the last writer wins, which is harmless since
/// results for one key are interchangeable.
pub struct CachedProvider {
    inner: Arc<dyn LlmProvider>,
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn lookup(&self, key: &str) -> Option<CachedValue> {
        let hit = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        if hit.is_some() {
            debug!(key, "Provider cache hit");
        }
        hit
    }

    fn store(&self, key: String, value: CachedValue) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }
}

pub fn profile_data_key(text: &str) -> String {
    format!("profile_data:{}", sha256_hex(text))
}

pub fn credibility_key(text: &str) -> String {
    format!("credibility:{}", sha256_hex(text))
}

/// Argument order is significant.
pub fn tailor_key(profile_text: &str, job_description: &str) -> String {
    format!(
        "tailor:{}",
        sha256_hex(format!("{profile_text}\n{job_description}"))
    )
}

#[async_trait]
impl LlmProvider for CachedProvider {
    async fn extract_profile_data(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ProfileFacts, ProviderError> {
        let key = profile_data_key(text);
        if let Some(CachedValue::Profile(facts)) = self.lookup(&key) {
            return Ok(facts);
        }
        let facts = self.inner.extract_profile_data(text, cancel).await?;
        self.store(key, CachedValue::Profile(facts.clone()));
        Ok(facts)
    }

    async fn extract_credibility(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CredibilityFacts, ProviderError> {
        let key = credibility_key(text);
        if let Some(CachedValue::Credibility(facts)) = self.lookup(&key) {
            return Ok(facts);
        }
        let facts = self.inner.extract_credibility(text, cancel).await?;
        self.store(key, CachedValue::Credibility(facts.clone()));
        Ok(facts)
    }

    async fn tailor(
        &self,
        profile_text: &str,
        job_description: &str,
        cancel: &CancellationToken,
    ) -> Result<TailorOutcome, ProviderError> {
        let key = tailor_key(profile_text, job_description);
        if let Some(CachedValue::Tailor(outcome)) = self.lookup(&key) {
            return Ok(outcome);
        }
        let outcome = self
            .inner
            .tailor(profile_text, job_description, cancel)
            .await?;
        self.store(key, CachedValue::Tailor(outcome.clone()));
        Ok(outcome)
    }
}
