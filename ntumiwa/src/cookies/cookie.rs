use chrono::{DateTime, Utc};
use headers::HeaderMapExt;
use http::HeaderMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// An outbound cookie and its attributes.
///
/// Defaults are the ones every session cookie needs: `Path=/`, `HttpOnly`, `Secure`
/// and `SameSite=Lax`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: "/".to_string(),
            expires: None,
            max_age: None,
            http_only: true,
            secure: true,
            same_site: SameSite::Lax,
        }
    }

    /// Serializes the cookie in `Set-Cookie` header form.
    pub fn to_header_string(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);

        if let Some(domain) = self.domain.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!("; Domain={domain}"));
        }
        out.push_str(&format!("; Path={}", self.path));
        if let Some(expires) = self.expires {
            out.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(&format!("; SameSite={}", self.same_site));
        out
    }
}

/// Returns the value of the named cookie from the request's `Cookie` header(s).
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let Some(cookies) = headers.typed_get::<headers::Cookie>() else {
        tracing::debug!("No cookie header found");
        return None;
    };

    let value = cookies.get(name).map(str::to_string);
    if value.is_none() {
        tracing::debug!("No cookie '{}' found in cookies", name);
    }
    value
}
