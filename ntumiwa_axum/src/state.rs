use std::sync::Arc;

use ntumiwa::catalog::CatalogStore;
use ntumiwa::{PasswordHasher, SessionManager, UserStore};

/// Everything the handlers and middleware share.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub users: Arc<dyn UserStore>,
    pub hasher: PasswordHasher,
    pub catalog: Arc<dyn CatalogStore>,
}
