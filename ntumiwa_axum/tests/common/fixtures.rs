use std::sync::Arc;

use axum::Router;
use ntumiwa::catalog::{CatalogStore, MemoryCatalog};
use ntumiwa::cookies::{SigningKey, read_signed};
use ntumiwa::{
    HashConfig, InMemorySessionStore, InMemoryUserStore, PasswordHasher, SessionConfig,
    SessionManager,
};
use ntumiwa_axum::{AppState, app_router};

pub const COOKIE_NAME: &str = "ntumiwa_session";
pub const TEST_SECRET: [u8; 32] = [0x5a; 32];
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

/// A router wired to in-memory stores, with direct handles on those stores.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sessions: Arc<InMemorySessionStore>,
    pub users: Arc<InMemoryUserStore>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_catalog(Arc::new(MemoryCatalog::new())).await
    }

    pub async fn with_catalog(catalog: Arc<dyn CatalogStore>) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let config = SessionConfig::new(COOKIE_NAME, &TEST_SECRET)
            .unwrap()
            .with_secure(false);
        let hasher = PasswordHasher::new(&HashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            ..HashConfig::default()
        })
        .unwrap();

        ntumiwa::auth::register(users.as_ref(), &hasher, ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .unwrap();

        let state = AppState {
            sessions: Arc::new(SessionManager::new(config, sessions.clone())),
            users: users.clone(),
            hasher,
            catalog,
        };

        Self {
            router: app_router(state.clone()),
            state,
            sessions,
            users,
        }
    }
}

/// Recovers the raw session id from a `name=value` cookie pair.
pub fn session_id_of(cookie_pair: &str) -> String {
    let (_, value) = cookie_pair.split_once('=').unwrap();
    let key = SigningKey::new(&TEST_SECRET).unwrap();
    read_signed(COOKIE_NAME, value, &key).unwrap()
}
