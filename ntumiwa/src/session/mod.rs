//! Server-side sessions carried by a signed cookie.
//!
//! [`SessionManager::start`] resolves (or mints) the session for a request, handlers read
//! and mutate it through a [`SessionContext`], and the manager persists it and writes the
//! cookie exactly once when the response goes out.

mod config;
mod errors;
mod main;
mod store;
mod types;

pub use config::{
    DEFAULT_ABSOLUTE_EXPIRATION, DEFAULT_GC_INTERVAL, DEFAULT_IDLE_EXPIRATION,
    DEFAULT_SESSION_COOKIE_NAME, MIN_SECRET_KEY_LEN, SessionConfig,
};
pub use errors::SessionError;
pub use main::{
    CSRF_FORM_FIELD, CSRF_HEADER, SessionContext, SessionManager, SweeperHandle,
    form_csrf_token, requires_csrf, spawn_sweeper, submitted_csrf_token, verify_csrf_token,
};
pub use store::{InMemorySessionStore, SessionStore};
pub use types::{AUTHENTICATED_KEY, CSRF_TOKEN_KEY, Session, USERNAME_KEY};
