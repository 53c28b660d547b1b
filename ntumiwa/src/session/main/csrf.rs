use http::{HeaderMap, Method};
use subtle::ConstantTimeEq;

use crate::session::types::Session;

/// Form field carrying the submitted token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";
/// Request header carrying the submitted token, and response header exposing the current one.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Whether requests with this method must present the session's CSRF token.
pub fn requires_csrf(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Reads the `csrf_token` field from an `application/x-www-form-urlencoded` body.
pub fn form_csrf_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Picks the submitted token: the form field when present, otherwise the header.
pub fn submitted_csrf_token(form_token: Option<String>, headers: &HeaderMap) -> Option<String> {
    form_token.or_else(|| {
        headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    })
}

/// Compares the submitted token with the session's token in constant time.
pub fn verify_csrf_token(session: &Session, submitted: Option<&str>) -> bool {
    let expected = match session.csrf_token() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Session has no usable CSRF token");
            return false;
        }
    };

    let Some(submitted) = submitted else {
        tracing::debug!("No CSRF token submitted");
        return false;
    };

    if expected.len() != submitted.len() {
        return false;
    }

    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}
