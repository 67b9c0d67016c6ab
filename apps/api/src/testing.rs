//! Wiring for tests that need a whole `AppState`.

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::Config;
use crate::models::User;
use crate::provider::fake::FakeProvider;
use crate::repository::memory::MemoryRepository;
use crate::state::AppState;
use crate::storage::LocalBlobStore;
use crate::tailoring::RateLimiter;

pub const S1_LETTER: &str = "Jane led the platform team at Acme from 2021-03-01 to 2023-06-30.";

pub struct TestApp {
    pub state: AppState,
    pub repo: MemoryRepository,
    pub llm: Arc<FakeProvider>,
    pub user: User,
    pub blob_dir: TempDir,
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://localhost/credfolio_test"),
        ("ANTHROPIC_API_KEY", "sk-test"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub async fn test_app(llm: FakeProvider) -> TestApp {
    test_app_with(llm, test_config(&[])).await
}

pub async fn test_app_with(llm: FakeProvider, config: Config) -> TestApp {
    let repo = MemoryRepository::new();
    let user = repo.seed_user("jane@example.com").await;
    let blob_dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(llm);
    let state = AppState {
        repo: Arc::new(repo.clone()),
        blobs: Arc::new(LocalBlobStore::new(blob_dir.path())),
        llm: llm.clone(),
        limiter: Arc::new(RateLimiter::per_minute(config.ai_requests_per_minute)),
        config,
    };
    TestApp {
        state,
        repo,
        llm,
        user,
        blob_dir,
    }
}

/// A fake scripted with the S1 extraction, credibility and a tailoring reply.
pub fn s1_provider() -> FakeProvider {
    FakeProvider::new()
        .with_profile(FakeProvider::s1_facts())
        .with_credibility(FakeProvider::s1_credibility())
        .with_tailor("Strong fit: platform leadership", 0.87)
}
