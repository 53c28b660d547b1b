use http::StatusCode;
use ntumiwa::catalog::CatalogError;
use ntumiwa::{AuthError, SessionError};

const INTERNAL_ERROR: &str = "Internal server error";

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

pub(crate) fn internal_error() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
}

pub(crate) fn auth_error(e: AuthError) -> (StatusCode, String) {
    let status = match e {
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UsernameTaken => StatusCode::CONFLICT,
        AuthError::PasswordTooShort(_) | AuthError::InvalidUsername => StatusCode::BAD_REQUEST,
        AuthError::Session(_) | AuthError::User(_) | AuthError::Hash(_) => {
            tracing::error!(error = %e, "Authentication failed internally");
            return internal_error();
        }
    };
    (status, e.to_string())
}

impl<T> IntoResponseError<T> for Result<T, AuthError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(auth_error)
    }
}

impl<T> IntoResponseError<T> for Result<T, CatalogError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
                CatalogError::Conflict(_)
                | CatalogError::ImmutableState(_)
                | CatalogError::StatusUnchanged(_) => StatusCode::CONFLICT,
                CatalogError::Storage(_) => {
                    tracing::error!(error = %e, "Catalog storage failed");
                    return internal_error();
                }
            };
            (status, e.to_string())
        })
    }
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            tracing::error!(error = %e, "Session operation failed");
            internal_error()
        })
    }
}
