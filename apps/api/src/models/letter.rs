use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use super::UnknownVariant;
use crate::validation::{require_non_empty, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LetterStatus {
    Pending,
    Processed,
    Failed,
}

impl LetterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterStatus::Pending => "PENDING",
            LetterStatus::Processed => "PROCESSED",
            LetterStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LetterStatus::Pending)
    }
}

impl fmt::Display for LetterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LetterStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(LetterStatus::Pending),
            "PROCESSED" => Ok(LetterStatus::Processed),
            "FAILED" => Ok(LetterStatus::Failed),
            _ => Err(UnknownVariant {
                kind: "letter status",
                value,
            }),
        }
    }
}

/// Letters only move `PENDING -> PROCESSED` or `PENDING -> FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("letter status cannot change from {from} to {to}")]
pub struct TransitionError {
    pub from: LetterStatus,
    pub to: LetterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReferenceLetter {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub upload_date: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: LetterStatus,
    pub extracted_text: String,
    /// Unset only for letters whose extracted text was empty.
    pub content_sha: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceLetter {
    /// A fresh `PENDING` letter. The id is left nil for the repository to assign.
    pub fn pending(
        user_id: Uuid,
        file_name: impl Into<String>,
        storage_path: impl Into<String>,
        extracted_text: impl Into<String>,
        content_sha: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            user_id,
            file_name: file_name.into(),
            storage_path: storage_path.into(),
            upload_date: now,
            status: LetterStatus::Pending,
            extracted_text: extracted_text.into(),
            content_sha,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_processed(&mut self) -> Result<(), TransitionError> {
        self.transition(LetterStatus::Processed)
    }

    pub fn mark_failed(&mut self) -> Result<(), TransitionError> {
        self.transition(LetterStatus::Failed)
    }

    fn transition(&mut self, to: LetterStatus) -> Result<(), TransitionError> {
        if self.status != LetterStatus::Pending || to == LetterStatus::Pending {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.file_name, "file_name")?;
        require_non_empty(&self.storage_path, "storage_path")?;
        if let Some(sha) = &self.content_sha {
            if sha.len() != 64 || !sha.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
                return Err(ValidationError::new(
                    "content_sha",
                    "content_sha must be a lower-case SHA-256 hex digest",
                ));
            }
        }
        Ok(())
    }
}
