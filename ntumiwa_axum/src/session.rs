use axum::extract::FromRequestParts;
use http::{HeaderMap, StatusCode, request::Parts};
use std::sync::Arc;
use tokio::sync::MutexGuard;

use ntumiwa::{AuthError, Session, SessionContext, SessionError, SessionManager};

use crate::error::internal_error;

/// The request's session, available as an Axum extractor under the session layer.
///
/// Changes made through it are saved and the session cookie is written once the handler
/// returns. Handlers that need the cookie earlier call [`CurrentSession::commit_cookie`];
/// the cookie is still written only once per request.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    manager: Arc<SessionManager>,
    context: SessionContext,
}

impl CurrentSession {
    pub(crate) fn new(manager: Arc<SessionManager>, context: SessionContext) -> Self {
        Self { manager, context }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.context.lock().await
    }

    /// Logs the session in as `username` under a fresh session id.
    ///
    /// Fails once [`commit_cookie`](Self::commit_cookie) has run for this request, since
    /// the committed cookie would still name the retired id.
    pub async fn login(&self, username: &str) -> Result<(), AuthError> {
        self.ensure_cookie_pending()?;
        let mut session = self.context.lock().await;
        ntumiwa::login(&self.manager, &mut session, username).await
    }

    /// Logs the session out under a fresh session id. Same ordering rule as
    /// [`login`](Self::login).
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.ensure_cookie_pending()?;
        let mut session = self.context.lock().await;
        ntumiwa::logout(&self.manager, &mut session).await
    }

    /// Writes the session cookie into `headers` now unless it was already written.
    ///
    /// Call it only after any login or logout in the same handler.
    pub async fn commit_cookie(&self, headers: &mut HeaderMap) -> Result<bool, SessionError> {
        self.manager.write_cookie_once(&self.context, headers).await
    }

    fn ensure_cookie_pending(&self) -> Result<(), AuthError> {
        if self.context.cookie_written() {
            tracing::error!("Session id change requested after the cookie was committed");
            return Err(AuthError::Session(SessionError::Invariant(
                "session cookie already committed".to_string(),
            )));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("No session on the request; is the session layer installed?");
                internal_error()
            })
    }
}

/// The logged-in user, inserted by [`require_auth`](crate::require_auth).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            tracing::error!("AuthUser requested on a route without the auth guard");
            internal_error()
        })
    }
}
