use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Application-level error for page and service code.
///
/// Validation problems are surfaced to the user; authorization problems
/// collapse into a generic forbidden response so nothing about other
/// couples' data leaks; integrity problems indicate a bug and are logged
/// as internal errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Invalid or expired link")]
    InvalidLink,

    #[error("{0}")]
    Validation(String),

    /// Referenced rows belong to a different couple.
    #[error("{0}")]
    Mismatch(String),

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Template(#[from] minijinja::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::Mismatch(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::InvalidLink => {
                (StatusCode::NOT_FOUND, "Invalid or expired link".to_string())
            }
            AppError::Validation(msg) | AppError::Mismatch(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }
            AppError::Email(_) => (
                StatusCode::BAD_GATEWAY,
                "Could not send email, please try again later".to_string(),
            ),
            AppError::Integrity(msg) => {
                tracing::error!("integrity violation: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Db(err) => {
                tracing::error!("database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Template(err) => {
                tracing::error!("template error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Html(message)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
