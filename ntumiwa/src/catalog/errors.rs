use thiserror::Error;

use super::types::EventStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    ImmutableState(String),

    #[error("Event is already {0}")]
    StatusUnchanged(EventStatus),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                CatalogError::Conflict("referenced record does not exist".to_string())
            }
            _ => CatalogError::Storage(err.to_string()),
        }
    }
}
