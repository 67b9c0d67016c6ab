use std::sync::Arc;

use crate::config::Config;
use crate::provider::LlmProvider;
use crate::repository::Repository;
use crate::storage::BlobStore;
use crate::tailoring::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub blobs: Arc<dyn BlobStore>,
    /// Usually a `CachedProvider` wrapping the live model.
    pub llm: Arc<dyn LlmProvider>,
    pub limiter: Arc<RateLimiter>,
    pub config: Config,
}
