//! Store error taxonomy.

use thiserror::Error;

/// Error returned by every repository operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("row not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("duplicate value")]
    Duplicate,

    /// Any other database failure.
    #[error("database error: {0}")]
    Io(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Duplicate,
            other => StoreError::Io(other),
        }
    }
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate)
    }
}
