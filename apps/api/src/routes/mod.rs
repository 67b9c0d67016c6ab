pub mod health;

use std::future::Future;
use std::time::Duration;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts, Path},
    http::request::Parts,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::letters::handlers as letters;
use crate::profile::handlers as profile;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;
use crate::validation::MAX_FILE_SIZE;

/// Header carrying the authenticated caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Largest accepted file plus room for multipart framing.
const BODY_LIMIT: usize = MAX_FILE_SIZE as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/reference-letters",
            post(letters::handle_upload).get(letters::handle_list),
        )
        .route("/api/v1/reference-letters/:id", get(letters::handle_get))
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_update_profile),
        )
        .route("/api/v1/profile/tailor", post(tailoring::handle_tailor))
        .route("/api/v1/profile/cv", get(profile::handle_download_cv))
        .route(
            "/api/v1/job-matches",
            get(tailoring::handle_list_job_matches),
        )
        .route(
            "/api/v1/job-matches/:id",
            get(tailoring::handle_get_job_match),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// The caller's user id, taken from the `X-User-Id` header.
/// Authentication happens upstream; a missing or malformed header is `Unauthorized`.
pub struct Caller(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .map(Caller)
            .ok_or(AppError::Unauthorized)
    }
}

/// A UUID path segment; anything else is `InvalidInput`.
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ResourceId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::InvalidInput(format!("invalid id: {}", e.body_text())))?;
        Ok(ResourceId(id))
    }
}

/// Bounds a whole request; on expiry the inner future is dropped, which rolls
/// back any open unit of work.
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
        Err(AppError::Cancelled(format!(
            "request exceeded {}s",
            timeout.as_secs()
        )))
    })
}
