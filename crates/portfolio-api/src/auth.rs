//! Request extractors for user and device credentials.
//!
//! - [`AuthUser`]: a valid access token is required
//! - [`MaybeAuthUser`]: an access token is optional; bad tokens count as anonymous
//! - [`DeviceAuth`]: a valid, unrevoked device token is required

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;
use tracing::debug;

use portfolio_auth::{require_roles, AuthError};
use portfolio_core::Role;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A user authenticated by an access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub username: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    /// Succeeds when the user holds one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<(), ApiError> {
        require_roles(&self.roles, allowed).map_err(ApiError::from)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let claims = state.jwt.verify_access(token)?;
        Ok(AuthUser {
            username: claims.sub,
            roles: claims.roles,
        })
    }
}

/// An optional [`AuthUser`].
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) => {
                if bearer_token(parts).is_some() {
                    debug!(subsystem = "api", component = "auth", error = ?e, "Ignoring invalid bearer token");
                }
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

/// A device authenticated by a device token.
#[derive(Debug, Clone)]
pub struct DeviceAuth {
    pub device_name: String,
    pub issued_by: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for DeviceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
        let claims = state.devices.verify(token)?;

        let record = state.db.device_tokens.get(claims.jti).await?;
        match record {
            Some(record) if record.is_usable(Utc::now()) => Ok(DeviceAuth {
                device_name: record.device_name,
                issued_by: record.issued_by,
                expires_at: record.expires_at,
            }),
            _ => Err(AuthError::Revoked.into()),
        }
    }
}
