use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// The serialized `Set-Cookie` value is longer than browsers accept
    #[error("cookie value too long")]
    ValueTooLong,

    #[error("invalid cookie value")]
    InvalidValue,
}
