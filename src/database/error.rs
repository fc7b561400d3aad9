use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    AlreadyExists,
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Maps unique-constraint violations to `AlreadyExists`, leaving all
    /// other database failures opaque.
    pub fn from_db(err: DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => RepositoryError::AlreadyExists,
            _ => RepositoryError::Database(err),
        }
    }
}
