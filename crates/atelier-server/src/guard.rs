//! Role guards.
//!
//! Each guard checks membership in one of the role sets from
//! [`atelier_core::roles`] and fails with the 403 detail callers see on
//! the wire. Ownership widening ("assigned user or admin") lives here too,
//! next to the plain role checks.

use atelier_core::{ADMIN_ONLY, ADMIN_OR_STAFF, Role, User, UserId};

use crate::errors::ApiError;

/// Require the admin role.
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    require_role(user, ADMIN_ONLY, "Admin access required")
}

/// Require admin or internal staff.
pub fn require_admin_or_staff(user: &User) -> Result<(), ApiError> {
    require_role(user, ADMIN_OR_STAFF, "Admin or staff access required")
}

/// Require the client role.
pub fn require_client(user: &User) -> Result<(), ApiError> {
    require_role(user, &[Role::Client], "Client access required")
}

/// Require that the caller is the assignee or an admin.
pub fn require_assignee_or_admin(user: &User, assignee: &UserId) -> Result<(), ApiError> {
    if user.role.is_admin() || user.id == *assignee {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Permission denied".into()))
    }
}

fn require_role(user: &User, allowed: &[Role], detail: &str) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(detail.to_owned()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
