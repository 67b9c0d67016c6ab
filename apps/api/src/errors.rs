use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::provider::ProviderError;
use crate::repository::RepoError;
use crate::storage::BlobError;
use crate::validation::ValidationError;

/// Error kinds that cross the service boundary.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Caller identity missing or malformed")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many AI requests; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable numeric identifier for clients.
    pub fn error_id(&self) -> u16 {
        match self {
            AppError::Unauthorized => 1001,
            AppError::Forbidden(_) => 1002,
            AppError::InvalidInput(_) => 1101,
            AppError::NotFound(_) => 1201,
            AppError::Conflict(_) => 1303,
            AppError::RateLimited { .. } => 1304,
            AppError::ExtractionFailed(_) => 1401,
            AppError::Internal(_) => 1501,
            AppError::Storage(_) => 1502,
            AppError::Provider(_) => 1503,
            AppError::Cancelled(_) => 1504,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Cancelled(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller; internal causes are replaced.
    fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "A storage error occurred".to_string(),
            AppError::Provider(_) => "An AI processing error occurred".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage(msg) => tracing::error!("Storage error: {msg}"),
            AppError::Provider(msg) => tracing::error!("Provider error: {msg}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::ExtractionFailed(msg) => tracing::warn!("Extraction failed: {msg}"),
            AppError::Cancelled(msg) => tracing::warn!("Cancelled: {msg}"),
            _ => {}
        }

        let body = Json(json!({
            "error_id": self.error_id(),
            "message": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::UniqueViolation(msg) => AppError::Conflict(msg),
            RepoError::NotFound { .. } => AppError::NotFound(err.to_string()),
            RepoError::Invalid(e) => AppError::InvalidInput(e.to_string()),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Cancelled | ProviderError::Timeout(_) => {
                AppError::Cancelled(err.to_string())
            }
            other => AppError::Provider(other.to_string()),
        }
    }
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::ExtractionFailed(err.to_string())
    }
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) | BlobError::InvalidPath(_) => {
                AppError::ExtractionFailed(err.to_string())
            }
            other => AppError::Storage(other.to_string()),
        }
    }
}
