use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid username/email or password")]
    InvalidCredentials,

    #[error("{0} is already taken")]
    DuplicateIdentity(&'static str),

    #[error("Password must be at least 6 characters long")]
    WeakCredential,

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Job title is required")]
    MissingTitle,

    #[error("{0} is required for publishing")]
    IncompleteForPublish(&'static str),

    #[error("You are not eligible to apply for this job")]
    NotEligible,

    #[error("You have already applied for this job")]
    DuplicateApplication,

    #[error("Invalid application status: {0}")]
    InvalidStatus(String),

    #[error("Reset token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("Submission failed, please try again")]
    SubmissionFailed,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AppError::DuplicateIdentity("username"),
            StoreError::DuplicateEmail => AppError::DuplicateIdentity("email"),
            StoreError::DuplicateApplication => AppError::DuplicateApplication,
            StoreError::NotFound => AppError::NotFound("resource".to_string()),
            other => AppError::Store(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                self.to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                self.to_string(),
            ),
            AppError::DuplicateIdentity(_) => {
                (StatusCode::CONFLICT, "DUPLICATE_IDENTITY", self.to_string())
            }
            AppError::WeakCredential => {
                (StatusCode::BAD_REQUEST, "WEAK_CREDENTIAL", self.to_string())
            }
            AppError::InvalidRole(_) => (StatusCode::BAD_REQUEST, "INVALID_ROLE", self.to_string()),
            AppError::MissingTitle => (StatusCode::BAD_REQUEST, "MISSING_TITLE", self.to_string()),
            AppError::IncompleteForPublish(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INCOMPLETE_FOR_PUBLISH",
                self.to_string(),
            ),
            AppError::NotEligible => (StatusCode::FORBIDDEN, "NOT_ELIGIBLE", self.to_string()),
            AppError::DuplicateApplication => (
                StatusCode::CONFLICT,
                "DUPLICATE_APPLICATION",
                self.to_string(),
            ),
            AppError::InvalidStatus(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_STATUS", self.to_string())
            }
            AppError::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "INVALID_OR_EXPIRED_TOKEN",
                self.to_string(),
            ),
            AppError::SubmissionFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SUBMISSION_FAILED",
                self.to_string(),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
