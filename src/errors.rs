use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::database::error::RepositoryError;

/// Failure taxonomy shared by the services. The web layer maps each kind
/// to a status code; no operation returns a partial success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,
    #[error("invalid credentials or token")]
    Forbidden,
    #[error("resource already exists")]
    AlreadyExists,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AppError::NotFound,
            RepositoryError::AlreadyExists => AppError::AlreadyExists,
            RepositoryError::Database(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use AppError::*;
        let status_code = match &self {
            NotFound => StatusCode::NOT_FOUND,
            Forbidden => StatusCode::FORBIDDEN,
            AlreadyExists => StatusCode::CONFLICT,
            InvalidInput(_) => StatusCode::BAD_REQUEST,
            Internal(msg) => {
                tracing::error!("internal error: {msg}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status_code, self.to_string()).into_response()
    }
}
