use thiserror::Error;

use crate::hash::HashError;
use crate::session::SessionError;
use crate::userdb::UserError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The session is not allowed to reach the resource.
    #[error("Unauthenticated")]
    Forbidden,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Invalid username")]
    InvalidUsername,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("User store error: {0}")]
    User(UserError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),
}

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::UsernameTaken => AuthError::UsernameTaken,
            other => AuthError::User(other),
        }
    }
}
