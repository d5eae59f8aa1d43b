//! Role-based authorization checks.

use portfolio_core::Role;

use crate::error::{AuthError, AuthResult};

/// Roles allowed to read datasets, posts and synchronization status.
pub const READ_ROLES: &[Role] = &[Role::Admin, Role::User];

/// Roles allowed to change datasets and trigger synchronization.
pub const WRITE_ROLES: &[Role] = &[Role::Admin];

/// Succeeds when the principal holds at least one of `allowed`.
pub fn require_roles(principal: &[Role], allowed: &[Role]) -> AuthResult<()> {
    if principal.iter().any(|r| allowed.contains(r)) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
