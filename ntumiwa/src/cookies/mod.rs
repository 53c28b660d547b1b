//! Signed cookie codec
//!
//! Cookie values are `base64url(HMAC-SHA256(key, name || raw) || raw)`, so a value read back
//! through [`read_signed`] is guaranteed to be one this server wrote under the same name.

mod cookie;
mod errors;
mod signed;

pub use cookie::{Cookie, SameSite, get_cookie};
pub use errors::CookieError;
pub use signed::{MAX_COOKIE_LEN, SIGNATURE_LEN, SigningKey, read_signed, write_signed};
