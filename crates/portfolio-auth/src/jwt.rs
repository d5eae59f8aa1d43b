//! JWT access and refresh tokens.
//!
//! Both token kinds share the signing secret and algorithm; the
//! `token_type` claim keeps a refresh token from being accepted as an access
//! token and vice versa.

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use portfolio_core::{defaults, Role};

use crate::error::{AuthError, AuthResult};

/// Kind of bearer token, carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    Device,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::Device => "device",
        }
    }
}

/// Claims carried by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    /// Roles at issue time. Refresh tokens carry none; roles are re-read on refresh.
    #[serde(default)]
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

/// Access/refresh pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// JWT configuration.
#[derive(Clone)]
pub struct JwtConfig {
    secret: Zeroizing<Vec<u8>>,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtConfig {
    /// Build a config with default lifetimes.
    pub fn new(secret: impl Into<Vec<u8>>, algorithm: Algorithm) -> AuthResult<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.is_empty() {
            return Err(AuthError::Config("JWT secret cannot be empty".into()));
        }
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Config(format!(
                "unsupported JWT algorithm {algorithm:?}; use HS256, HS384 or HS512"
            )));
        }
        Ok(Self {
            secret,
            algorithm,
            access_ttl: Duration::minutes(defaults::JWT_ACCESS_TOKEN_EXPIRE_MINUTES),
            refresh_ttl: Duration::minutes(defaults::JWT_REFRESH_TOKEN_EXPIRE_MINUTES),
        })
    }

    /// Load from environment variables.
    ///
    /// - `JWT_SECRET_KEY` (required)
    /// - `JWT_ALGORITHM` (default HS256)
    /// - `JWT_ACCESS_TOKEN_EXPIRE_MINUTES` (default 30)
    /// - `JWT_REFRESH_TOKEN_EXPIRE_MINUTES` (default 10080)
    pub fn from_env() -> AuthResult<Self> {
        let secret = std::env::var("JWT_SECRET_KEY")
            .map_err(|_| AuthError::Config("JWT_SECRET_KEY is not set".into()))?;
        let algorithm_name =
            std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| defaults::JWT_ALGORITHM.to_string());
        let algorithm = Algorithm::from_str(&algorithm_name)
            .map_err(|_| AuthError::Config(format!("unknown JWT_ALGORITHM: {algorithm_name}")))?;

        let mut config = Self::new(secret.into_bytes(), algorithm)?;
        if let Some(minutes) = env_minutes("JWT_ACCESS_TOKEN_EXPIRE_MINUTES") {
            config.access_ttl = Duration::minutes(minutes);
        }
        if let Some(minutes) = env_minutes("JWT_REFRESH_TOKEN_EXPIRE_MINUTES") {
            config.refresh_ttl = Duration::minutes(minutes);
        }
        Ok(config)
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

fn env_minutes(name: &str) -> Option<i64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|m| *m > 0)
}

/// Issues and verifies access/refresh tokens.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding = EncodingKey::from_secret(&config.secret);
        let decoding = DecodingKey::from_secret(&config.secret);
        Self {
            config,
            encoding,
            decoding,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    fn issue(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(self.config.algorithm), claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn claims(&self, sub: &str, roles: Vec<Role>, ttl: Duration, token_type: TokenType) -> Claims {
        let now = Utc::now();
        Claims {
            sub: sub.to_string(),
            roles,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
        }
    }

    pub fn issue_access(&self, username: &str, roles: Vec<Role>) -> AuthResult<String> {
        let claims = self.claims(
            username,
            Role::effective(roles),
            self.config.access_ttl,
            TokenType::Access,
        );
        self.issue(&claims)
    }

    pub fn issue_refresh(&self, username: &str) -> AuthResult<String> {
        let claims = self.claims(username, Vec::new(), self.config.refresh_ttl, TokenType::Refresh);
        self.issue(&claims)
    }

    /// Issue an access/refresh pair for a user.
    pub fn issue_pair(&self, username: &str, roles: Vec<Role>) -> AuthResult<TokenPair> {
        debug!(
            subsystem = "auth",
            component = "jwt",
            op = "issue_pair",
            username,
            "Issuing token pair"
        );
        Ok(TokenPair {
            access_token: self.issue_access(username, roles)?,
            refresh_token: self.issue_refresh(username)?,
            token_type: "bearer".to_string(),
            expires_in: self.config.access_ttl.num_seconds(),
        })
    }

    fn verify(&self, token: &str, expected: TokenType) -> AuthResult<Claims> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
                found: data.claims.token_type.as_str(),
            });
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> AuthResult<Claims> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AuthResult<Claims> {
        self.verify(token, TokenType::Refresh)
    }
}
