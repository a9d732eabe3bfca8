//! The [`Role`] enum and the static permission sets used by route guards.
//!
//! Roles are a closed set. Authorization is expressed as membership in one
//! of the `&[Role]` constants below, optionally widened by an ownership
//! predicate (e.g. "assigned staff or admin") at the call site.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role, fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access: user management, projects, ticket triage, all timers.
    Admin,
    /// Internal staff: works assigned tasks and tracks time on them.
    InternalStaff,
    /// External client: raises tickets and observes progress on own projects.
    Client,
}

/// Routes reserved for administrators.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Routes open to administrators and internal staff.
pub const ADMIN_OR_STAFF: &[Role] = &[Role::Admin, Role::InternalStaff];

/// All roles in definition order.
pub const ALL_ROLES: [Role; 3] = [Role::Admin, Role::InternalStaff, Role::Client];

impl Role {
    /// Return the canonical string representation (e.g. `"internal_staff"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::InternalStaff => "internal_staff",
            Self::Client => "client",
        }
    }

    /// Whether this role is the administrator role.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether this role belongs to an external client account.
    #[must_use]
    pub fn is_client(self) -> bool {
        matches!(self, Self::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Parse through serde; the `rename_all` attribute is the source of truth.
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
            .map_err(|_| format!("unknown role: {s}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_matches_wire_names() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::InternalStaff.as_str(), "internal_staff");
        assert_eq!(Role::Client.as_str(), "client");
    }

    #[test]
    fn serde_roundtrip_all_variants() {
        for role in ALL_ROLES {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::Value::String(role.as_str().to_owned()));
            let back: Role = serde_json::from_value(json).unwrap();
            assert_eq!(role, back);
        }
    }

    #[test]
    fn from_str_all_variants() {
        for role in ALL_ROLES {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn from_str_rejects_invalid() {
        let err = "superuser".parse::<Role>();
        assert!(err.is_err());
        assert!(err.unwrap_err().contains("unknown role"));
    }

    #[test]
    fn admin_only_set() {
        assert!(ADMIN_ONLY.contains(&Role::Admin));
        assert!(!ADMIN_ONLY.contains(&Role::InternalStaff));
        assert!(!ADMIN_ONLY.contains(&Role::Client));
    }

    #[test]
    fn admin_or_staff_set() {
        assert!(ADMIN_OR_STAFF.contains(&Role::Admin));
        assert!(ADMIN_OR_STAFF.contains(&Role::InternalStaff));
        assert!(!ADMIN_OR_STAFF.contains(&Role::Client));
    }

    #[test]
    fn role_predicates() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::InternalStaff.is_admin());
        assert!(Role::Client.is_client());
        assert!(!Role::Admin.is_client());
    }

    #[test]
    fn display_matches_as_str() {
        for role in ALL_ROLES {
            assert_eq!(format!("{role}"), role.as_str());
        }
    }
}
