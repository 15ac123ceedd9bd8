//! Unified error handling for the portal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{
    account::AccountError, models::FieldErrors, repository::RepositoryError, storage::UploadError,
};

/// Application-level error type returned by page handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend collection call failed.
    #[error("Backend error: {0}")]
    Repository(#[from] RepositoryError),

    /// Image host call failed or the file was rejected.
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// Form input did not pass validation.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Credentials did not match any account.
    #[error("{0}")]
    Unauthorized(String),

    /// The signed-in user may not act on this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The request conflicts with existing data.
    #[error("{0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::CredentialMismatch | AccountError::WrongCurrentPassword => {
                AppError::Unauthorized(err.to_string())
            }
            AccountError::AccountLocked => AppError::Forbidden(err.to_string()),
            AccountError::DuplicateEmail => AppError::Conflict(err.to_string()),
            AccountError::UnknownUser => AppError::NotFound(err.to_string()),
            AccountError::Validation(errors) => AppError::Validation(errors),
            AccountError::Repository(e) => AppError::Repository(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Repository(_) => StatusCode::BAD_GATEWAY,
            Self::Upload(UploadError::NotAnImage | UploadError::TooLarge) => {
                StatusCode::BAD_REQUEST
            }
            Self::Upload(UploadError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upload(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = match &self {
            Self::Validation(errors) => json!({ "message": "Validation failed", "errors": errors }),
            // Don't expose backend details to clients
            Self::Repository(_) => json!({ "message": "Could not reach the server" }),
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
