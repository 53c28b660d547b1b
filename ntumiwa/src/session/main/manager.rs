use chrono::Utc;
use http::HeaderMap;
use http::header::SET_COOKIE;
use std::sync::Arc;

use crate::cookies::{Cookie, SameSite, get_cookie, read_signed, write_signed};
use crate::session::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::store::SessionStore;
use crate::session::types::{CSRF_TOKEN_KEY, Session, new_csrf_token, new_session_id};

use super::context::SessionContext;

/// Owns the session lifecycle: resolving the request cookie, persisting changes,
/// rotating ids and emitting the `Set-Cookie` header.
pub struct SessionManager {
    config: SessionConfig,
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Resolves the request's session, minting a fresh one when the cookie is missing,
    /// tampered with, unknown or expired.
    ///
    /// Only random generation can fail here; every cookie or store problem ends in a new
    /// session instead.
    #[tracing::instrument(skip_all)]
    pub async fn start(&self, headers: &HeaderMap) -> Result<SessionContext, SessionError> {
        if let Some(session) = self.resolve(headers).await {
            return Ok(SessionContext::new(session, false));
        }

        let session = Session::new()?;
        tracing::debug!("Minted new session");
        Ok(SessionContext::new(session, true))
    }

    async fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        let cookie = get_cookie(headers, &self.config.cookie_name)?;

        let id = match read_signed(&self.config.cookie_name, &cookie, &self.config.signing_key) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(reason = %e, "Rejected session cookie");
                return None;
            }
        };

        let session = match self.store.read(&id).await {
            Ok(session) => session,
            Err(SessionError::NotFound) => {
                tracing::debug!("Session cookie refers to an unknown session");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read session");
                return None;
            }
        };

        if !self.validate(&session).await {
            return None;
        }
        Some(session)
    }

    /// Checks both lifetimes. An expired session is destroyed before `false` is returned.
    pub async fn validate(&self, session: &Session) -> bool {
        let expired = session.is_expired(
            Utc::now(),
            self.config.idle_expiration,
            self.config.absolute_expiration,
        );
        if !expired {
            return true;
        }

        tracing::debug!("Session expired");
        match self.store.destroy(&session.id).await {
            Ok(()) | Err(SessionError::NotFound) => {}
            Err(e) => tracing::error!(error = %e, "Failed to destroy expired session"),
        }
        false
    }

    /// Stamps the last activity time and persists the context's session.
    ///
    /// A session still under the id it was loaded with is only replaced while that id is
    /// stored. If another request migrated or destroyed it meanwhile, this copy is dropped.
    /// Minted and migrated sessions are inserted under their new id.
    pub async fn save(&self, context: &SessionContext) -> Result<(), SessionError> {
        let mut session = context.lock().await;
        session.last_activity_at = Utc::now();

        if context.loaded_id() != Some(session.id()) {
            return self.store.write(&session).await;
        }
        match self.store.update(&session).await {
            Err(SessionError::NotFound) => {
                tracing::debug!("Session was retired by another request, not saving");
                Ok(())
            }
            result => result,
        }
    }

    /// Gives the session a fresh id and CSRF token and removes the old id from the store.
    ///
    /// Every other data entry is kept. A session that was never persisted migrates cleanly.
    pub async fn migrate(&self, session: &mut Session) -> Result<(), SessionError> {
        let new_id = new_session_id()?;
        let new_token = new_csrf_token()?;

        match self.store.destroy(&session.id).await {
            Ok(()) => {}
            Err(SessionError::NotFound) => {
                tracing::debug!("Migrating a session that was never saved")
            }
            Err(e) => return Err(e),
        }

        session.id = new_id;
        session.put(CSRF_TOKEN_KEY, new_token);
        tracing::debug!("Session migrated to a new id");
        Ok(())
    }

    /// Appends the signed session cookie to `headers`.
    pub fn write_cookie(
        &self,
        session: &Session,
        headers: &mut HeaderMap,
    ) -> Result<(), SessionError> {
        let mut cookie = Cookie::new(&self.config.cookie_name, &session.id);
        cookie.domain = self.config.domain.clone();
        cookie.expires = Some(Utc::now() + self.config.idle_expiration);
        cookie.max_age = Some(self.config.idle_expiration.num_seconds());
        cookie.http_only = true;
        cookie.secure = self.config.secure;
        cookie.same_site = SameSite::Lax;

        let value = write_signed(cookie, &self.config.signing_key)?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }

    /// Writes the cookie for this request unless it has already been written.
    ///
    /// Returns whether this call wrote it.
    pub async fn write_cookie_once(
        &self,
        context: &SessionContext,
        headers: &mut HeaderMap,
    ) -> Result<bool, SessionError> {
        if !context.claim_cookie_write() {
            return Ok(false);
        }
        let session = context.lock().await;
        self.write_cookie(&session, headers)?;
        Ok(true)
    }

    /// Removes every expired session from the store.
    pub async fn sweep(&self) -> Result<usize, SessionError> {
        self.store
            .sweep(self.config.idle_expiration, self.config.absolute_expiration)
            .await
    }
}
