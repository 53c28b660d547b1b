//! ntumiwa - session, CSRF and authentication core for the ntumiwa concert site backend
//!
//! This crate is framework-agnostic: it works on `http` header maps and leaves routing to
//! `ntumiwa_axum`. It provides signed session cookies, server-side sessions with idle and
//! absolute expiry, CSRF token checks, password-based login and the concert catalog.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod cookies;
pub mod hash;
pub mod session;
pub mod userdb;
mod utils;

pub use auth::{AuthError, authorize, is_authenticated, login, logout};
pub use config::{AdminBootstrap, AppConfig, AppEnv, ConfigError, LogConfig, LogStyle};
pub use hash::{HashConfig, PasswordHasher};
pub use session::{
    InMemorySessionStore, Session, SessionConfig, SessionContext, SessionError, SessionManager,
    SessionStore, SweeperHandle, spawn_sweeper,
};
pub use userdb::{InMemoryUserStore, SqliteUserStore, User, UserError, UserStore};
pub use utils::{UtilError, gen_random_string};
