//! Error types for authentication and authorization.

use thiserror::Error;

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Token could not be decoded or its signature is wrong.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token signature is valid but `exp` has passed.
    #[error("Token expired")]
    Expired,

    /// A token of one kind was presented where another was required.
    #[error("Wrong token type: expected {expected}, got {found}")]
    WrongTokenType {
        expected: &'static str,
        found: &'static str,
    },

    /// Device token was revoked or is unknown.
    #[error("Device token revoked")]
    Revoked,

    /// Username/password pair did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Principal lacks every required role.
    #[error("{}", portfolio_core::defaults::PERMISSION_DENIED_MESSAGE)]
    Forbidden,

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidToken(e.to_string()),
        }
    }
}

impl From<AuthError> for portfolio_core::Error {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Forbidden => portfolio_core::Error::Forbidden(
                portfolio_core::defaults::PERMISSION_DENIED_MESSAGE.to_string(),
            ),
            AuthError::Config(msg) => portfolio_core::Error::Config(msg),
            AuthError::PasswordHash(msg) => portfolio_core::Error::Internal(msg),
            other => portfolio_core::Error::Unauthorized(other.to_string()),
        }
    }
}
