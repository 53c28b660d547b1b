use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("Invalid hash parameters: {0}")]
    Params(String),

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error("Hashing task failed: {0}")]
    Task(String),
}

impl From<UtilError> for HashError {
    fn from(err: UtilError) -> Self {
        HashError::Hash(err.to_string())
    }
}
