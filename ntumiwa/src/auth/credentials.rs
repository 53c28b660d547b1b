use crate::hash::PasswordHasher;
use crate::userdb::{User, UserStore};

use super::errors::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Creates a user with a freshly hashed password.
#[tracing::instrument(skip(users, hasher, password))]
pub async fn register(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    if users.user_exists(username).await? {
        return Err(AuthError::UsernameTaken);
    }

    let hash = hasher.hash_blocking(password).await?;
    users.create_user(User::new(username, hash)).await?;
    tracing::info!("Registered user");
    Ok(())
}

/// Checks a username and password pair.
///
/// Unknown users run a verification against the dummy hash so both failure paths take
/// the same time and return the same error.
#[tracing::instrument(skip(users, hasher, password))]
pub async fn verify_credentials(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<(), AuthError> {
    let stored = users.password_hash(username).await?;
    if hasher.verify_blocking(stored, password).await? {
        Ok(())
    } else {
        tracing::info!("Invalid credentials");
        Err(AuthError::InvalidCredentials)
    }
}

/// Creates the configured administrator unless the account already exists.
pub async fn ensure_user(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> Result<bool, AuthError> {
    match register(users, hasher, username, password).await {
        Ok(()) => Ok(true),
        Err(AuthError::UsernameTaken) => Ok(false),
        Err(e) => Err(e),
    }
}
