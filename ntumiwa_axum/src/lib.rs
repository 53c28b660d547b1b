//! Axum integration for the ntumiwa core: the session layer, the auth guard, extractors
//! and the HTTP routes.

mod auth;
mod catalog;
mod error;
mod middleware;
mod router;
mod session;
mod state;

pub use error::IntoResponseError;
pub use middleware::{require_auth, session_layer};
pub use router::app_router;
pub use session::{AuthUser, CurrentSession};
pub use state::AppState;
