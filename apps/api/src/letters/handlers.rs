use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use tokio_util::sync::CancellationToken;

use crate::errors::AppError;
use crate::letters::{get_letter, ingest, list_letters, Upload};
use crate::models::ReferenceLetter;
use crate::routes::{with_deadline, Caller, ResourceId};
use crate::state::AppState;

/// POST /api/v1/reference-letters
/// Multipart body with a single `file` part.
pub async fn handle_upload(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ReferenceLetter>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("could not read file part: {e}")))?;

        // dropping the handler future (client gone) cancels in-flight model calls
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        let upload = Upload {
            file_name: &file_name,
            content_type: content_type.as_deref(),
            reader: &bytes[..],
        };
        let letter = with_deadline(
            state.config.request_timeout,
            ingest(&state, user_id, upload, &cancel),
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(letter)));
    }
    Err(AppError::InvalidInput(
        "multipart body must contain a 'file' part".to_string(),
    ))
}

/// GET /api/v1/reference-letters
pub async fn handle_list(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<ReferenceLetter>>, AppError> {
    Ok(Json(list_letters(&state, user_id).await?))
}

/// GET /api/v1/reference-letters/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    ResourceId(id): ResourceId,
) -> Result<Json<ReferenceLetter>, AppError> {
    Ok(Json(get_letter(&state, user_id, id).await?))
}
