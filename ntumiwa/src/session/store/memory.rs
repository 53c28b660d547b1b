use async_trait::async_trait;
use chrono::{TimeDelta, Utc};

use crate::session::errors::SessionError;
use crate::session::types::Session;

use super::types::{InMemorySessionStore, SessionStore};

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self::default()
    }

    /// Number of sessions currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn read(&self, id: &str) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    async fn write(&self, session: &Session) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(&session.id).ok_or(SessionError::NotFound)?;
        *stored = session.clone();
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(SessionError::NotFound)
    }

    async fn sweep(&self, idle: TimeDelta, absolute: TimeDelta) -> Result<usize, SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, idle, absolute));
        Ok(before - sessions.len())
    }
}
