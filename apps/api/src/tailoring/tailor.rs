use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::JobMatch;
use crate::profile::{load_profile, project_profile};
use crate::repository::JobMatchStore;
use crate::state::AppState;
use crate::validation::{clamp_match_score, sanitize_text, validate_job_description};

/// Scores and rewrites the caller's profile for one job description and
/// records the result as a new job match.
///
/// The profile graph is read, never written. Every call creates a new match,
/// even for a job description seen before.
pub async fn tailor(
    state: &AppState,
    user_id: Uuid,
    job_description: &str,
    cancel: &CancellationToken,
) -> Result<JobMatch, AppError> {
    validate_job_description(job_description)?;
    let job_description = sanitize_text(job_description);
    if job_description.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "job_description has no printable content".to_string(),
        ));
    }

    let profile = {
        let mut uow = state.repo.begin().await?;
        let profile = load_profile(uow.as_mut(), user_id).await;
        uow.rollback().await?;
        profile?
    };
    let profile_text = project_profile(&profile);

    state.limiter.check(user_id)?;
    let outcome = state
        .llm
        .tailor(&profile_text, &job_description, cancel)
        .await?;
    let score = clamp_match_score(outcome.score)
        .map_err(|e| AppError::Provider(format!("model returned an unusable score: {e}")))?;

    let mut uow = state.repo.begin().await?;
    let job_match = uow
        .create_job_match(&JobMatch::new(
            profile.id,
            job_description,
            score,
            outcome.summary,
        ))
        .await?;
    uow.commit().await?;

    info!(
        %user_id,
        profile_id = %profile.id,
        job_match_id = %job_match.id,
        match_score = job_match.match_score,
        "Profile tailored"
    );
    Ok(job_match)
}
