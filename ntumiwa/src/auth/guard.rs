use crate::session::{
    AUTHENTICATED_KEY, Session, SessionContext, SessionManager, USERNAME_KEY,
};
use crate::userdb::UserStore;

use super::errors::AuthError;

pub fn is_authenticated(session: &Session) -> Result<bool, AuthError> {
    Ok(session.is_authenticated()?)
}

/// Marks the session as logged in as `username`, migrating it to a new id first.
#[tracing::instrument(skip(manager, session))]
pub async fn login(
    manager: &SessionManager,
    session: &mut Session,
    username: &str,
) -> Result<(), AuthError> {
    manager.migrate(session).await?;
    session.put(AUTHENTICATED_KEY, true);
    session.put(USERNAME_KEY, username);
    tracing::info!("User logged in");
    Ok(())
}

/// Migrates the session to a new id, then clears the login.
#[tracing::instrument(skip_all)]
pub async fn logout(manager: &SessionManager, session: &mut Session) -> Result<(), AuthError> {
    manager.migrate(session).await?;
    session.put(AUTHENTICATED_KEY, false);
    session.delete(USERNAME_KEY);
    tracing::info!("User logged out");
    Ok(())
}

/// Admits the request only if its session is logged in as a user that still exists.
///
/// A session naming a deleted user is treated as a possible hijack: it is logged out
/// under a new id before the request is refused. Returns the username on success.
#[tracing::instrument(skip_all)]
pub async fn authorize(
    manager: &SessionManager,
    context: &SessionContext,
    users: &dyn UserStore,
) -> Result<String, AuthError> {
    let mut session = context.lock().await;

    if !session.is_authenticated()? {
        tracing::info!("Rejected unauthenticated request");
        return Err(AuthError::Forbidden);
    }

    let Some(username) = session.username().map(str::to_string) else {
        tracing::error!("Authenticated session has no string username");
        return Err(AuthError::Forbidden);
    };

    match users.user_exists(&username).await {
        Ok(true) => Ok(username),
        Ok(false) => {
            tracing::warn!(%username, "Authenticated session for a user that no longer exists");
            if let Err(e) = logout(manager, &mut session).await {
                tracing::error!(error = %e, "Failed to migrate session of missing user");
            }
            Err(AuthError::Forbidden)
        }
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed");
            Err(AuthError::Forbidden)
        }
    }
}
