use thiserror::Error;

use crate::cookies::CookieError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    #[error("Session invariant violated: {0}")]
    Invariant(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<UtilError> for SessionError {
    fn from(err: UtilError) -> Self {
        SessionError::Crypto(err.to_string())
    }
}
