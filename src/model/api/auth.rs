use serde::{Deserialize, Serialize};

use crate::model::{
    api::{
        id::ApiId,
        validation::{Violation, Violations},
    },
    auth::Role,
    db::User,
};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 32;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Check the credentials are acceptable for a new account.
    pub fn validate(&self) -> Result<(), Vec<Violation>> {
        let mut violations = Violations::new();
        self.check(&mut violations);
        violations.into_result()
    }

    fn check(&self, violations: &mut Violations) {
        let length = self.username.chars().count();
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
            violations.push(
                "username",
                format!(
                    "must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
                ),
            );
        } else if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            violations.push(
                "username",
                "may only contain letters, digits, '_', '.' and '-'",
            );
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            violations.push(
                "password",
                format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
    }
}

/// A request by an admin to create a user with a specific role.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UserSpec {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub role: String,
}

impl UserSpec {
    /// Validate the request, returning the credentials and the parsed role.
    pub fn validate(self) -> Result<(Credentials, Role), Vec<Violation>> {
        let mut violations = Violations::new();
        self.credentials.check(&mut violations);
        match self.role.parse::<Role>() {
            Ok(role) => {
                violations.into_result()?;
                Ok((self.credentials, role))
            }
            Err(e) => {
                violations.push("role", e);
                Err(violations.into_vec())
            }
        }
    }
}

/// An API-friendly description of a user, without their password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
    pub role: String,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            role: user.role.to_string(),
            username: user.user.username,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        /// Distinct, valid credentials for a user of each role.
        pub fn example_for(role: Role) -> Self {
            Self {
                username: format!("example-{role}"),
                password: format!("{role}-password"),
            }
        }
    }
}
