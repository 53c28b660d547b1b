use async_trait::async_trait;
use std::collections::hash_map::Entry;

use crate::userdb::errors::UserError;
use crate::userdb::types::User;

use super::types::{InMemoryUserStore, UserStore};

impl InMemoryUserStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory user store");
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn user_exists(&self, username: &str) -> Result<bool, UserError> {
        Ok(self.users.read().await.contains_key(username))
    }

    async fn password_hash(&self, username: &str) -> Result<Option<String>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .get(username)
            .map(|user| user.password_hash.clone()))
    }

    async fn create_user(&self, user: User) -> Result<(), UserError> {
        match self.users.write().await.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(UserError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    async fn delete_user(&self, username: &str) -> Result<(), UserError> {
        self.users
            .write()
            .await
            .remove(username)
            .map(|_| ())
            .ok_or(UserError::NotFound)
    }
}
