use hmac::{Hmac, Mac, digest::InvalidLength};
use http::HeaderValue;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

use super::cookie::Cookie;
use super::errors::CookieError;
use crate::utils::{base64url_decode, base64url_encode};

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of the HMAC-SHA256 signature prefix.
pub const SIGNATURE_LEN: usize = 32;

/// Browsers drop cookies whose serialized form exceeds this many bytes.
pub const MAX_COOKIE_LEN: usize = 4096;

/// HMAC key used to sign and verify cookie values.
///
/// The keyed MAC state is built once and cloned per signature, so signing itself cannot fail.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl SigningKey {
    pub fn new(secret: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
        })
    }

    fn sign(&self, name: &str, value: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut mac = self.mac.clone();
        mac.update(name.as_bytes());
        mac.update(value);

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&mac.finalize().into_bytes());
        signature
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// Signs `cookie.value` and returns the complete `Set-Cookie` header value.
pub fn write_signed(mut cookie: Cookie, key: &SigningKey) -> Result<HeaderValue, CookieError> {
    let signature = key.sign(&cookie.name, cookie.value.as_bytes());

    let mut signed = Vec::with_capacity(SIGNATURE_LEN + cookie.value.len());
    signed.extend_from_slice(&signature);
    signed.extend_from_slice(cookie.value.as_bytes());
    cookie.value = base64url_encode(&signed);

    let serialized = cookie.to_header_string();
    if serialized.len() > MAX_COOKIE_LEN {
        return Err(CookieError::ValueTooLong);
    }

    HeaderValue::from_str(&serialized).map_err(|_| CookieError::InvalidValue)
}

/// Verifies a cookie value produced by [`write_signed`] and returns the raw value.
pub fn read_signed(name: &str, cookie_text: &str, key: &SigningKey) -> Result<String, CookieError> {
    let decoded = base64url_decode(cookie_text).map_err(|_| CookieError::InvalidValue)?;

    if decoded.len() < SIGNATURE_LEN {
        return Err(CookieError::InvalidValue);
    }

    let (signature, value) = decoded.split_at(SIGNATURE_LEN);
    let expected = key.sign(name, value);

    if !bool::from(expected[..].ct_eq(signature)) {
        return Err(CookieError::InvalidValue);
    }

    String::from_utf8(value.to_vec()).map_err(|_| CookieError::InvalidValue)
}
