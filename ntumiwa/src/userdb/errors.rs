use thiserror::Error;

#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => UserError::UsernameTaken,
            _ => UserError::Storage(err.to_string()),
        }
    }
}
