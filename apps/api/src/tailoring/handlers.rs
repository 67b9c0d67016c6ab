use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::AppError;
use crate::models::{JobMatch, MatchBand};
use crate::routes::{with_deadline, Caller, ResourceId};
use crate::state::AppState;
use crate::tailoring::{get_job_match, list_job_matches, tailor};

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct JobMatchResponse {
    #[serde(flatten)]
    pub job_match: JobMatch,
    pub band: MatchBand,
}

impl From<JobMatch> for JobMatchResponse {
    fn from(job_match: JobMatch) -> Self {
        Self {
            band: job_match.band(),
            job_match,
        }
    }
}

/// POST /api/v1/profile/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<TailorRequest>,
) -> Result<(StatusCode, Json<JobMatchResponse>), AppError> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let job_match = with_deadline(
        state.config.request_timeout,
        tailor(&state, user_id, &req.job_description, &cancel),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(job_match.into())))
}

/// GET /api/v1/job-matches
pub async fn handle_list_job_matches(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<JobMatchResponse>>, AppError> {
    let matches = list_job_matches(&state, user_id).await?;
    Ok(Json(matches.into_iter().map(Into::into).collect()))
}

/// GET /api/v1/job-matches/:id
pub async fn handle_get_job_match(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    ResourceId(id): ResourceId,
) -> Result<Json<JobMatchResponse>, AppError> {
    Ok(Json(get_job_match(&state, user_id, id).await?.into()))
}
