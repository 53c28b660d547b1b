use chrono::TimeDelta;
use std::time::Duration;

use crate::config::{AppEnv, ConfigError, env_duration_or, env_or, env_parse_or, env_required};
use crate::cookies::SigningKey;

pub const DEFAULT_SESSION_COOKIE_NAME: &str = "ntumiwa_session";
pub const DEFAULT_IDLE_EXPIRATION: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_ABSOLUTE_EXPIRATION: Duration = Duration::from_secs(8 * 60 * 60);
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Minimum accepted length of the cookie signing secret, in bytes.
pub const MIN_SECRET_KEY_LEN: usize = 32;

/// Immutable settings shared by every session operation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub domain: Option<String>,
    pub idle_expiration: TimeDelta,
    pub absolute_expiration: TimeDelta,
    pub gc_interval: Duration,
    /// Whether the cookie carries the `Secure` attribute
    pub secure: bool,
    pub(crate) signing_key: SigningKey,
}

impl SessionConfig {
    /// Builds a config with default lifetimes around the given signing secret.
    pub fn new(cookie_name: impl Into<String>, secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_KEY_LEN {
            return Err(ConfigError::SecretKeyLength {
                actual: secret.len(),
                expected: MIN_SECRET_KEY_LEN,
            });
        }
        let signing_key = SigningKey::new(secret).map_err(|_| ConfigError::SecretKeyLength {
            actual: secret.len(),
            expected: MIN_SECRET_KEY_LEN,
        })?;

        Ok(Self {
            cookie_name: cookie_name.into(),
            domain: None,
            idle_expiration: to_delta("SESSION_TTI", DEFAULT_IDLE_EXPIRATION)?,
            absolute_expiration: to_delta("SESSION_TTL", DEFAULT_ABSOLUTE_EXPIRATION)?,
            gc_interval: DEFAULT_GC_INTERVAL,
            secure: true,
            signing_key,
        })
    }

    pub fn with_idle_expiration(mut self, idle: TimeDelta) -> Self {
        self.idle_expiration = idle;
        self
    }

    pub fn with_absolute_expiration(mut self, absolute: TimeDelta) -> Self {
        self.absolute_expiration = absolute;
        self
    }

    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn from_env(app_env: AppEnv) -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok(), app_env)
    }

    /// `SECRET_KEY` is hex and must decode to exactly `KEY_LENGTH` bytes.
    pub fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        app_env: AppEnv,
    ) -> Result<Self, ConfigError> {
        let secret_hex = env_required(lookup, "SECRET_KEY")?;
        let secret = hex::decode(secret_hex.trim()).map_err(|_| ConfigError::Invalid {
            key: "SECRET_KEY".to_string(),
            value: "<redacted>".to_string(),
        })?;

        let expected: usize = env_parse_or(lookup, "KEY_LENGTH", MIN_SECRET_KEY_LEN);
        if secret.len() != expected {
            return Err(ConfigError::SecretKeyLength {
                actual: secret.len(),
                expected,
            });
        }

        let cookie_name = env_or(lookup, "SESSION_COOKIE_NAME", DEFAULT_SESSION_COOKIE_NAME);
        let mut config = Self::new(cookie_name, &secret)?;

        config.domain = lookup("SESSION_COOKIE_DOMAIN").filter(|d| !d.is_empty());
        config.idle_expiration = to_delta(
            "SESSION_TTI",
            env_duration_or(lookup, "SESSION_TTI", DEFAULT_IDLE_EXPIRATION),
        )?;
        config.absolute_expiration = to_delta(
            "SESSION_TTL",
            env_duration_or(lookup, "SESSION_TTL", DEFAULT_ABSOLUTE_EXPIRATION),
        )?;
        config.gc_interval = env_duration_or(lookup, "GC_INTERVAL", DEFAULT_GC_INTERVAL);
        if config.gc_interval.is_zero() {
            tracing::warn!("GC_INTERVAL: zero is not allowed, using default");
            config.gc_interval = DEFAULT_GC_INTERVAL;
        }
        config.secure = app_env != AppEnv::Dev;

        Ok(config)
    }
}

fn to_delta(key: &str, duration: Duration) -> Result<TimeDelta, ConfigError> {
    TimeDelta::from_std(duration).map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: format!("{duration:?}"),
    })
}
