//! `/api/auth/v1` token endpoints and `/api/device/v1`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use portfolio_auth::{verify_password, TokenPair, WRITE_ROLES};
use portfolio_core::{DeviceToken, Role, User};

use crate::auth::{AuthUser, DeviceAuth};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceTokenRequest {
    pub device_name: String,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeviceTokenResponse {
    pub id: Uuid,
    pub device_token: String,
    pub device_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeviceMeResponse {
    pub device: String,
    pub issued_by: String,
    pub expires_at: DateTime<Utc>,
}

/// An active user by name, or `InvalidCredentials`.
async fn active_user(state: &AppState, username: &str) -> Result<User, ApiError> {
    match state.db.users.get_by_username(username).await? {
        Some(user) if user.is_active => Ok(user),
        _ => Err(ApiError::InvalidCredentials),
    }
}

/// POST /api/auth/v1/token
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = active_user(&state, &req.username).await?;
    if !verify_password(&req.password, &user.password_hash) {
        warn!(
            subsystem = "api",
            component = "auth",
            username = %req.username,
            "Login rejected"
        );
        return Err(ApiError::InvalidCredentials);
    }

    let roles = state.db.users.roles(user.id).await?;
    let pair = state.jwt.issue_pair(&user.username, roles)?;
    info!(subsystem = "api", component = "auth", username = %user.username, "Login");
    Ok(Json(pair))
}

/// POST /api/auth/v1/refresh
///
/// Roles are re-read so grants and revocations apply on the next refresh.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let claims = state
        .jwt
        .verify_refresh(&req.refresh_token)
        .map_err(|_| ApiError::InvalidCredentials)?;
    let user = active_user(&state, &claims.sub).await?;
    let roles = state.db.users.roles(user.id).await?;
    Ok(Json(state.jwt.issue_pair(&user.username, roles)?))
}

/// GET /api/auth/v1/me
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        username: user.username,
        roles: user.roles,
    })
}

/// POST /api/auth/v1/device-token
pub async fn create_device_token(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<DeviceTokenRequest>,
) -> Result<(StatusCode, Json<DeviceTokenResponse>), ApiError> {
    user.require(WRITE_ROLES)?;

    let ttl = match req.expires_in_days {
        Some(days) if days <= 0 => {
            return Err(ApiError::BadRequest(
                "expires_in_days must be positive".to_string(),
            ))
        }
        Some(days) => Some(Duration::days(days)),
        None => None,
    };
    let issued = state
        .devices
        .issue(&req.device_name, &user.username, ttl)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.db.device_tokens.insert(&issued.record).await?;

    info!(
        subsystem = "api",
        component = "auth",
        device = %issued.record.device_name,
        issued_by = %user.username,
        "Device token issued"
    );
    Ok((
        StatusCode::CREATED,
        Json(DeviceTokenResponse {
            id: issued.record.id,
            device_token: issued.token,
            device_name: issued.record.device_name,
            expires_at: issued.record.expires_at,
        }),
    ))
}

/// GET /api/auth/v1/device-token
pub async fn list_device_tokens(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<DeviceToken>>, ApiError> {
    user.require(WRITE_ROLES)?;
    Ok(Json(state.db.device_tokens.list_active().await?))
}

/// DELETE /api/auth/v1/device-token/:id
pub async fn revoke_device_token(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(WRITE_ROLES)?;
    if !state.db.device_tokens.revoke(id).await? {
        return Err(ApiError::NotFound(format!("device token {id}")));
    }
    info!(subsystem = "api", component = "auth", token_id = %id, revoked_by = %user.username, "Device token revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/device/v1/me
pub async fn device_me(device: DeviceAuth) -> Json<DeviceMeResponse> {
    Json(DeviceMeResponse {
        device: device.device_name,
        issued_by: device.issued_by,
        expires_at: device.expires_at,
    })
}
