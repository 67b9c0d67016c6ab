//! Tailoring a profile to a job description, and the job matches it leaves behind.

pub mod handlers;
mod limiter;
mod tailor;

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::JobMatch;
use crate::repository::{JobMatchStore, ProfileStore};
use crate::state::AppState;

pub use limiter::RateLimiter;
pub use tailor::tailor;

/// Newest first. A caller without a profile has no matches.
pub async fn list_job_matches(state: &AppState, user_id: Uuid) -> Result<Vec<JobMatch>, AppError> {
    let mut uow = state.repo.begin().await?;
    let matches = match uow.profile_by_user(user_id).await? {
        Some(profile) => uow.job_matches_by_profile(profile.id).await?,
        None => Vec::new(),
    };
    uow.rollback().await?;
    Ok(matches)
}

pub async fn get_job_match(
    state: &AppState,
    user_id: Uuid,
    job_match_id: Uuid,
) -> Result<JobMatch, AppError> {
    let mut uow = state.repo.begin().await?;
    let job_match = uow.job_match_by_id(job_match_id).await?;
    let profile = uow.profile_by_user(user_id).await?;
    uow.rollback().await?;

    let job_match = job_match
        .ok_or_else(|| AppError::NotFound(format!("job match {job_match_id} not found")))?;
    if profile.map(|p| p.id) != Some(job_match.base_profile_id) {
        return Err(AppError::Forbidden(format!(
            "job match {job_match_id} belongs to another user"
        )));
    }
    Ok(job_match)
}
