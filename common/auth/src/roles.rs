use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform user roles, ordered from least to most privileged.
///
/// The ordering is total: a higher role satisfies any gate a lower role
/// satisfies. Role checks must go through [`Role::satisfies`] rather than
/// equality so that `Admin` always passes a `Moderator` gate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// True when this role meets or exceeds `min` on the total order.
    pub fn satisfies(&self, min: Role) -> bool {
        *self >= min
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_total() {
        assert!(Role::User < Role::Moderator);
        assert!(Role::Moderator < Role::Admin);
    }

    #[test]
    fn higher_roles_satisfy_lower_gates() {
        assert!(Role::Admin.satisfies(Role::Moderator));
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Moderator.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Moderator));
        assert!(!Role::Moderator.satisfies(Role::Admin));
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("owner".parse::<Role>().is_err());
    }
}
