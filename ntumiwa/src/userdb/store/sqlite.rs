use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

use crate::userdb::errors::UserError;
use crate::userdb::types::User;

use super::types::{SqliteUserStore, UserStore};

const DB_TABLE_USERS: &str = "users";

impl SqliteUserStore {
    /// Connects to `url` and creates the users table when missing.
    pub async fn connect(url: &str) -> Result<Self, UserError> {
        // Every connection to `sqlite::memory:` opens its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, UserError> {
        let store = Self { pool };
        store.create_tables().await?;
        tracing::info!("Connected to SQLite user store");
        Ok(store)
    }

    async fn create_tables(&self) -> Result<(), UserError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {DB_TABLE_USERS} (
                username TEXT PRIMARY KEY NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn user_exists(&self, username: &str) -> Result<bool, UserError> {
        let found: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT 1 FROM {DB_TABLE_USERS} WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn password_hash(&self, username: &str) -> Result<Option<String>, UserError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT username, password_hash, created_at FROM {DB_TABLE_USERS} WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(|user| user.password_hash))
    }

    async fn create_user(&self, user: User) -> Result<(), UserError> {
        sqlx::query(&format!(
            "INSERT INTO {DB_TABLE_USERS} (username, password_hash, created_at) VALUES (?, ?, ?)"
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> Result<(), UserError> {
        let result = sqlx::query(&format!("DELETE FROM {DB_TABLE_USERS} WHERE username = ?"))
            .bind(username)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }
        Ok(())
    }
}
