//! Central configuration for the ntumiwa crate
//!
//! Everything is read from the process environment once at startup and is immutable
//! afterwards. Each config type has a `from_lookup` constructor taking the variable
//! lookup as a closure so parsing can be exercised without touching the real environment.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::hash::HashConfig;
use crate::session::SessionConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(String),

    #[error("{key}: invalid value {value:?}")]
    Invalid { key: String, value: String },

    #[error("secret key is {actual} bytes; want {expected} bytes")]
    SecretKeyLength { actual: usize, expected: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Dev,
    Test,
    Staging,
    Prod,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEV" => Ok(AppEnv::Dev),
            "TEST" => Ok(AppEnv::Test),
            "STAGING" => Ok(AppEnv::Staging),
            "PROD" => Ok(AppEnv::Prod),
            _ => Err(ConfigError::Invalid {
                key: "APP_ENV".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub style: LogStyle,
    /// Default filter directive, e.g. `info`
    pub level: String,
}

impl LogConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let style = match env_or(lookup, "LOG_STYLE", "text").to_lowercase().as_str() {
            "text" => LogStyle::Text,
            "json" => LogStyle::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_STYLE".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let level = match env_or(lookup, "LOG_LEVEL", "info").to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            level @ ("trace" | "debug" | "info" | "warn" | "error") => level.to_string(),
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_LEVEL".to_string(),
                    value: other.to_string(),
                });
            }
        };

        Ok(Self { style, level })
    }
}

/// Initial administrator account created at startup when absent
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_env: AppEnv,
    pub log: LogConfig,
    pub session: SessionConfig,
    pub hash: HashConfig,
    /// sqlx connection string for the user database; users are kept in memory when unset
    pub database_url: Option<String>,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let app_env: AppEnv = env_required(lookup, "APP_ENV")?.parse()?;

        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Some(AdminBootstrap { username, password })
            }
            _ => None,
        };

        Ok(Self {
            host: env_or(lookup, "HOST", "0.0.0.0"),
            port: env_parse_or(lookup, "PORT", 8080),
            app_env,
            log: LogConfig::from_lookup(lookup)?,
            session: SessionConfig::from_lookup(lookup, app_env)?,
            hash: HashConfig::from_lookup(lookup),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn env_required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

pub(crate) fn env_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key).filter(|value| !value.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("{key}: {value} invalid, using default: {default}");
            default
        }),
    }
}

pub(crate) fn env_duration_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    match lookup(key).filter(|value| !value.is_empty()) {
        None => default,
        Some(value) => parse_duration(&value).unwrap_or_else(|| {
            tracing::warn!("{key}: {value} invalid, using default: {default:?}");
            default
        }),
    }
}

/// Parses `90`, `90s`, `15m`, `1h`, `1h30m` or `500ms` into a duration.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "h" => Duration::from_secs(amount.checked_mul(3600)?),
            _ => return None,
        };
        total = total.checked_add(part)?;
        rest = &rest[unit_len..];
    }
    Some(total)
}
