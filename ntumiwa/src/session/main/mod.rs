mod context;
mod csrf;
mod manager;
mod sweeper;

pub use context::SessionContext;
pub use csrf::{
    CSRF_FORM_FIELD, CSRF_HEADER, form_csrf_token, requires_csrf, submitted_csrf_token,
    verify_csrf_token,
};
pub use manager::SessionManager;
pub use sweeper::{SweeperHandle, spawn_sweeper};
