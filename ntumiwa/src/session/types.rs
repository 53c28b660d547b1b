use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::errors::SessionError;
use crate::utils::gen_random_string;

/// Reserved data key holding the per-session CSRF token.
pub const CSRF_TOKEN_KEY: &str = "csrf_token";
/// Reserved data key holding the authentication flag.
pub const AUTHENTICATED_KEY: &str = "authenticated";
/// Reserved data key holding the logged-in username.
pub const USERNAME_KEY: &str = "username";

/// Bytes of entropy behind session ids and CSRF tokens.
pub(crate) const TOKEN_BYTES: usize = 32;

/// Server-side state for one client.
///
/// A fresh session always carries a CSRF token and `authenticated = false`; both keys
/// stay present for the session's whole lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub(crate) id: String,
    pub(crate) data: HashMap<String, Value>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new() -> Result<Self, SessionError> {
        let now = Utc::now();
        let mut data = HashMap::new();
        data.insert(
            CSRF_TOKEN_KEY.to_string(),
            Value::String(new_csrf_token()?),
        );
        data.insert(AUTHENTICATED_KEY.to_string(), Value::Bool(false));

        Ok(Self {
            id: new_session_id()?,
            data,
            created_at: now,
            last_activity_at: now,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn csrf_token(&self) -> Result<&str, SessionError> {
        match self.data.get(CSRF_TOKEN_KEY) {
            Some(Value::String(token)) => Ok(token),
            Some(_) => Err(SessionError::Invariant(
                "csrf token is not a string".to_string(),
            )),
            None => Err(SessionError::Invariant("csrf token missing".to_string())),
        }
    }

    pub fn is_authenticated(&self) -> Result<bool, SessionError> {
        match self.data.get(AUTHENTICATED_KEY) {
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(_) => Err(SessionError::Invariant(
                "authenticated flag is not a boolean".to_string(),
            )),
            None => Err(SessionError::Invariant(
                "authenticated flag missing".to_string(),
            )),
        }
    }

    /// The stored username, if present and a string.
    pub fn username(&self) -> Option<&str> {
        self.data.get(USERNAME_KEY).and_then(Value::as_str)
    }

    /// True once either the idle or the absolute lifetime has been exceeded at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, idle: TimeDelta, absolute: TimeDelta) -> bool {
        now - self.created_at > absolute || now - self.last_activity_at > idle
    }
}

pub(crate) fn new_session_id() -> Result<String, SessionError> {
    Ok(gen_random_string(TOKEN_BYTES)?)
}

pub(crate) fn new_csrf_token() -> Result<String, SessionError> {
    Ok(gen_random_string(TOKEN_BYTES)?)
}
