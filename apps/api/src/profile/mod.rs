//! Profile reads, summary edits and CV download.

pub mod handlers;
mod projection;

use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Profile;
use crate::render::render_cv;
use crate::repository::{JobMatchStore, ProfileStore, UnitOfWork};
use crate::state::AppState;
use crate::validation::{sanitize_text, validate_summary};

pub use projection::{project_profile, MAX_PROJECTION_CHARS};

/// The caller's profile with every relation loaded.
pub async fn get_profile(state: &AppState, user_id: Uuid) -> Result<Profile, AppError> {
    let mut uow = state.repo.begin().await?;
    let profile = load_profile(uow.as_mut(), user_id).await;
    uow.rollback().await?;
    profile
}

pub(crate) async fn load_profile(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
) -> Result<Profile, AppError> {
    uow.profile_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no profile for user {user_id}")))
}

/// Replaces the summary. `None`, or text that is empty once sanitized, clears it.
pub async fn update_profile_summary(
    state: &AppState,
    user_id: Uuid,
    summary: Option<&str>,
) -> Result<Profile, AppError> {
    let summary = summary.map(sanitize_text).filter(|s| !s.is_empty());
    if let Some(summary) = &summary {
        validate_summary(summary)?;
    }

    let mut uow = state.repo.begin().await?;
    let mut profile = load_profile(uow.as_mut(), user_id).await?;
    profile.summary = summary;
    uow.update_profile(&profile).await?;
    let updated = load_profile(uow.as_mut(), user_id).await?;
    uow.commit().await?;

    info!(%user_id, profile_id = %updated.id, "Profile summary updated");
    Ok(updated)
}

/// Renders the caller's CV, optionally with the tailored summary of one of
/// the caller's job matches.
pub async fn download_cv(
    state: &AppState,
    user_id: Uuid,
    job_match_id: Option<Uuid>,
) -> Result<Vec<u8>, AppError> {
    let mut uow = state.repo.begin().await?;
    let profile = load_profile(uow.as_mut(), user_id).await?;
    let job_match = match job_match_id {
        Some(id) => {
            let job_match = uow
                .job_match_by_id(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("job match {id} not found")))?;
            if job_match.base_profile_id != profile.id {
                return Err(AppError::Forbidden(format!(
                    "job match {id} belongs to another profile"
                )));
            }
            Some(job_match)
        }
        None => None,
    };
    uow.rollback().await?;

    // layout is CPU-bound
    let bytes = tokio::task::spawn_blocking(move || render_cv(&profile, job_match.as_ref()))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(bytes)
}
