//! Reference letters: the ingestion pipeline and owner-scoped lookups.

pub mod handlers;
mod ingest;

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ReferenceLetter;
use crate::repository::ReferenceLetterStore;
use crate::state::AppState;

pub use ingest::{ingest, Upload};

/// Newest upload first.
pub async fn list_letters(
    state: &AppState,
    user_id: Uuid,
) -> Result<Vec<ReferenceLetter>, AppError> {
    let mut uow = state.repo.begin().await?;
    let letters = uow.letters_by_user(user_id).await?;
    uow.rollback().await?;
    Ok(letters)
}

pub async fn get_letter(
    state: &AppState,
    user_id: Uuid,
    letter_id: Uuid,
) -> Result<ReferenceLetter, AppError> {
    let mut uow = state.repo.begin().await?;
    let letter = uow.letter_by_id(letter_id).await?;
    uow.rollback().await?;

    let letter =
        letter.ok_or_else(|| AppError::NotFound(format!("reference letter {letter_id} not found")))?;
    if letter.user_id != user_id {
        return Err(AppError::Forbidden(format!(
            "reference letter {letter_id} belongs to another user"
        )));
    }
    Ok(letter)
}
