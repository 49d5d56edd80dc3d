//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Classify a failed INSERT, reporting unique-constraint hits as `Duplicate`
    pub(crate) fn from_insert(err: sqlx::Error, duplicate: impl FnOnce() -> String) -> Self {
        let unique_violation = err
            .as_database_error()
            .is_some_and(|e| e.is_unique_violation());

        if unique_violation {
            DbError::Duplicate(duplicate())
        } else {
            DbError::Connection(err)
        }
    }
}
