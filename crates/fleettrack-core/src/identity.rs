use std::fmt;

use serde::{Deserialize, Serialize};

/// Role carried by a connection's verified credential.
///
/// Only `Driver` may publish location updates; only `Admin` and
/// `Manager` receive broadcasts. A credential with no role claim, or
/// one the relay does not recognize, maps to `Unknown`: the connection
/// is admitted but can neither publish nor receive. That lax default
/// is deliberate, in contrast to the strict numeric-id requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Driver,
    Admin,
    Manager,
    Unknown,
}

impl Role {
    /// Map an optional role claim to a role. Absent or unrecognized
    /// values become `Unknown` rather than failing authentication.
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some("DRIVER") => Self::Driver,
            Some("ADMIN") => Self::Admin,
            Some("MANAGER") => Self::Manager,
            _ => Self::Unknown,
        }
    }

    /// Whether this role may originate location updates.
    pub fn may_publish(self) -> bool {
        matches!(self, Self::Driver)
    }

    /// Whether this role receives broadcast fan-out.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver => write!(f, "DRIVER"),
            Self::Admin => write!(f, "ADMIN"),
            Self::Manager => write!(f, "MANAGER"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Verified identity attached to a connection at admission, immutable
/// for the connection's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_id: i64,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles_parse() {
        assert_eq!(Role::from_claim(Some("DRIVER")), Role::Driver);
        assert_eq!(Role::from_claim(Some("ADMIN")), Role::Admin);
        assert_eq!(Role::from_claim(Some("MANAGER")), Role::Manager);
    }

    #[test]
    fn absent_role_defaults_to_unknown() {
        assert_eq!(Role::from_claim(None), Role::Unknown);
    }

    #[test]
    fn unrecognized_role_defaults_to_unknown() {
        assert_eq!(Role::from_claim(Some("COOK")), Role::Unknown);
        assert_eq!(Role::from_claim(Some("driver")), Role::Unknown);
        assert_eq!(Role::from_claim(Some("")), Role::Unknown);
    }

    #[test]
    fn only_drivers_publish() {
        assert!(Role::Driver.may_publish());
        assert!(!Role::Admin.may_publish());
        assert!(!Role::Manager.may_publish());
        assert!(!Role::Unknown.may_publish());
    }

    #[test]
    fn only_admin_and_manager_are_privileged() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::Manager.is_privileged());
        assert!(!Role::Driver.is_privileged());
        assert!(!Role::Unknown.is_privileged());
    }

    #[test]
    fn role_display_matches_claim_strings() {
        assert_eq!(Role::Driver.to_string(), "DRIVER");
        assert_eq!(Role::Unknown.to_string(), "UNKNOWN");
    }
}
