//! Device tokens for non-human clients.
//!
//! Signed with their own key so a leaked user secret cannot mint device
//! credentials. Each token carries a `jti` matching a stored
//! [`DeviceToken`] row, which is how revocation is checked.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use portfolio_core::{defaults, DeviceToken};

use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenType;

/// Claims carried by a device token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceClaims {
    /// Device name.
    pub sub: String,
    /// Id of the stored token record.
    pub jti: Uuid,
    /// Username of the admin who issued the token.
    pub issued_by: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

impl DeviceClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly issued device token and its stored record.
#[derive(Debug, Clone)]
pub struct IssuedDeviceToken {
    pub token: String,
    pub record: DeviceToken,
}

/// Issues and verifies device tokens.
#[derive(Clone)]
pub struct DeviceTokenService {
    key: Zeroizing<Vec<u8>>,
    default_ttl: Duration,
}

impl DeviceTokenService {
    pub fn new(key: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let key = Zeroizing::new(key.into());
        if key.is_empty() {
            return Err(AuthError::Config("device token key cannot be empty".into()));
        }
        Ok(Self {
            key,
            default_ttl: Duration::days(defaults::DEVICE_TOKEN_EXPIRE_DAYS),
        })
    }

    /// Load from `DEVICE_TOKEN_KEY` and `DEVICE_TOKEN_EXPIRE_DAYS`.
    pub fn from_env() -> AuthResult<Self> {
        let key = std::env::var("DEVICE_TOKEN_KEY")
            .map_err(|_| AuthError::Config("DEVICE_TOKEN_KEY is not set".into()))?;
        let mut service = Self::new(key.into_bytes())?;
        if let Some(days) = std::env::var("DEVICE_TOKEN_EXPIRE_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|d| *d > 0)
        {
            service.default_ttl = Duration::days(days);
        }
        Ok(service)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token for `device_name`. The caller persists `record`.
    pub fn issue(
        &self,
        device_name: &str,
        issued_by: &str,
        ttl: Option<Duration>,
    ) -> AuthResult<IssuedDeviceToken> {
        let device_name = device_name.trim();
        if device_name.is_empty() {
            return Err(AuthError::InvalidToken("device name cannot be empty".into()));
        }

        let now = Utc::now();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);
        let record = DeviceToken {
            id: Uuid::now_v7(),
            device_name: device_name.to_string(),
            issued_by: issued_by.to_string(),
            created_at: now,
            expires_at,
            revoked: false,
        };
        let claims = DeviceClaims {
            sub: record.device_name.clone(),
            jti: record.id,
            issued_by: record.issued_by.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Device,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.key),
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(IssuedDeviceToken { token, record })
    }

    /// Verify signature, expiry and token type. Revocation is checked by the caller.
    pub fn verify(&self, token: &str) -> AuthResult<DeviceClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<DeviceClaims>(token, &DecodingKey::from_secret(&self.key), &validation)?;
        if data.claims.token_type != TokenType::Device {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Device.as_str(),
                found: data.claims.token_type.as_str(),
            });
        }
        Ok(data.claims)
    }
}
