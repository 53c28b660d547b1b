use async_trait::async_trait;
use chrono::TimeDelta;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::session::errors::SessionError;
use crate::session::types::Session;

/// Process-local session store guarded by a single reader/writer lock.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    pub(super) sessions: RwLock<HashMap<String, Session>>,
}

// Trait
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Fetch a copy of the session stored under `id`.
    ///
    /// Returns [`SessionError::NotFound`] when no session has that id.
    async fn read(&self, id: &str) -> Result<Session, SessionError>;

    /// Insert or replace the session under its id.
    async fn write(&self, session: &Session) -> Result<(), SessionError>;

    /// Replace the session only while its id is still stored.
    ///
    /// Returns [`SessionError::NotFound`] when the id has been destroyed, so a stale copy
    /// can never bring a retired id back.
    async fn update(&self, session: &Session) -> Result<(), SessionError>;

    /// Remove the session stored under `id`.
    ///
    /// Returns [`SessionError::NotFound`] when no session has that id.
    async fn destroy(&self, id: &str) -> Result<(), SessionError>;

    /// Remove every session whose idle or absolute lifetime has elapsed.
    /// Returns how many sessions were removed.
    async fn sweep(&self, idle: TimeDelta, absolute: TimeDelta) -> Result<usize, SessionError>;
}
