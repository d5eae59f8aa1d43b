//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use portfolio_auth::AuthError;
use portfolio_core::defaults::PERMISSION_DENIED_MESSAGE;

/// Message returned for a failed login or refresh.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Debug)]
pub enum ApiError {
    Internal(portfolio_core::Error),
    /// Bad username/password or refresh token; rendered as `{"message": ...}`.
    InvalidCredentials,
    Unauthorized(String),
    /// Rendered as `{"detail": ...}` with the permission message.
    Forbidden,
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<portfolio_core::Error> for ApiError {
    fn from(err: portfolio_core::Error) -> Self {
        use portfolio_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::ProgressNotFound(id) => {
                ApiError::NotFound(format!("synchronization progress {id}"))
            }
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(_) => ApiError::Forbidden,
            other => ApiError::Internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden => ApiError::Forbidden,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Config(msg) => ApiError::Internal(portfolio_core::Error::Config(msg)),
            AuthError::PasswordHash(msg) => {
                ApiError::Internal(portfolio_core::Error::Internal(msg))
            }
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "message": INVALID_CREDENTIALS_MESSAGE }),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                serde_json::json!({ "detail": PERMISSION_DENIED_MESSAGE }),
            ),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": err.to_string() }),
                )
            }
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
