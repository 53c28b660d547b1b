use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::userdb::errors::UserError;
use crate::userdb::types::User;

/// Users kept in process memory, mainly for tests and single-instance setups.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    pub(super) users: RwLock<HashMap<String, User>>,
}

/// Users persisted in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pub(super) pool: Pool<Sqlite>,
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn user_exists(&self, username: &str) -> Result<bool, UserError>;

    /// The stored PHC hash, or `None` when the user does not exist.
    async fn password_hash(&self, username: &str) -> Result<Option<String>, UserError>;

    /// Fails with [`UserError::UsernameTaken`] when the username is in use.
    async fn create_user(&self, user: User) -> Result<(), UserError>;

    /// Fails with [`UserError::NotFound`] when the user does not exist.
    async fn delete_user(&self, username: &str) -> Result<(), UserError>;
}
