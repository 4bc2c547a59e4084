use std::fmt::Display;
use std::str::FromStr;

use mongodb::bson::{to_bson, Bson};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    Student = 0,
    Moderator = 1,
    Admin = 2,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Student => "student",
                Self::Moderator => "moderator",
                Self::Admin => "admin",
            }
        )
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

impl From<Role> for Bson {
    fn from(role: Role) -> Self {
        to_bson(&role).expect("Serialisation is infallible")
    }
}

/// A set of roles permitted to perform some action.
pub trait RoleSet {
    const ALLOWED: &'static [Role];
}

/// Users who may create and close polls and surveys.
pub struct Staff;

impl RoleSet for Staff {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::Moderator];
}

/// Users who may manage other users.
pub struct Admins;

impl RoleSet for Admins {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for role in [Role::Student, Role::Moderator, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn staff_excludes_students() {
        assert!(Staff::ALLOWED.contains(&Role::Moderator));
        assert!(Staff::ALLOWED.contains(&Role::Admin));
        assert!(!Staff::ALLOWED.contains(&Role::Student));
        assert_eq!(Admins::ALLOWED, &[Role::Admin]);
    }
}
