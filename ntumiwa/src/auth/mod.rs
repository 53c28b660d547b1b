//! Login state on top of sessions, and the credential checks behind it.

mod credentials;
mod errors;
mod guard;

pub use credentials::{MIN_PASSWORD_LEN, ensure_user, register, verify_credentials};
pub use errors::AuthError;
pub use guard::{authorize, is_authenticated, login, logout};
