use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Profile;
use crate::profile::{download_cv, get_profile, update_profile_summary};
use crate::routes::Caller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateSummaryRequest {
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CvQuery {
    pub job_match_id: Option<Uuid>,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(get_profile(&state, user_id).await?))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<UpdateSummaryRequest>,
) -> Result<Json<Profile>, AppError> {
    let profile = update_profile_summary(&state, user_id, req.summary.as_deref()).await?;
    Ok(Json(profile))
}

/// GET /api/v1/profile/cv?job_match_id=<uuid>
pub async fn handle_download_cv(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Query(params): Query<CvQuery>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = download_cv(&state, user_id, params.job_match_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"cv.pdf\""),
        ],
        bytes,
    ))
}
