//! # portfolio-auth
//!
//! Credentials for the portfolio admin API.
//!
//! - **Passwords**: Argon2id PHC strings
//! - **User tokens**: HMAC-signed JWT access/refresh pairs
//! - **Device tokens**: long-lived JWTs signed with a separate key and
//!   tracked by `jti` for revocation
//! - **Roles**: `admin`, `user`, `guest` with any-of checks

pub mod device;
pub mod error;
pub mod jwt;
pub mod password;
pub mod roles;

pub use device::{DeviceClaims, DeviceTokenService, IssuedDeviceToken};
pub use error::{AuthError, AuthResult};
pub use jsonwebtoken::Algorithm;
pub use jwt::{Claims, JwtConfig, JwtService, TokenPair, TokenType};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use roles::{require_roles, READ_ROLES, WRITE_ROLES};
