use std::ops::{Deref, DerefMut};

use argon2::Config as Argon2Config;
use log::{info, warn};
use mongodb::bson::doc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::auth::Credentials,
    auth::Role,
    mongodb::{Coll, Id},
};

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl UserCore {
    /// Create a new user with the given role by hashing the password.
    /// Credentials are expected to have been validated already.
    pub fn new(credentials: Credentials, role: Role) -> std::result::Result<Self, argon2::Error> {
        // 16 bytes is the recommended salt length for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(
            credentials.password.as_bytes(),
            &salt,
            &Argon2Config::default(),
        )?;
        Ok(Self {
            username: credentials.username,
            password_hash,
            role,
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(
        &self,
        password: T,
    ) -> std::result::Result<bool, argon2::Error> {
        argon2::verify_encoded(&self.password_hash, password.as_ref())
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl User {
    /// Assign a fresh ID to a new user.
    pub fn new(user: NewUser) -> Self {
        Self { id: Id::new(), user }
    }
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Ensure there is at least one admin, creating one from `credentials` if not.
///
/// Without credentials nobody can create moderators, so this is logged loudly,
/// but the server still starts.
pub async fn ensure_admin_exists(
    users: &Coll<User>,
    credentials: Option<Credentials>,
) -> Result<()> {
    let admins = users
        .count_documents(doc! { "role": Role::Admin }, None)
        .await?;
    if admins > 0 {
        return Ok(());
    }
    match credentials {
        Some(credentials) => {
            let admin = User::new(NewUser::new(credentials, Role::Admin)?);
            users.insert_one(&admin, None).await?;
            info!("Created initial admin '{}'", admin.username);
        }
        None => warn!("No admin exists and no initial admin credentials are configured"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let user = NewUser::new(Credentials::example_for(Role::Student), Role::Student).unwrap();
        assert_eq!(user.username, Credentials::example_for(Role::Student).username);
        assert_ne!(user.password_hash, Credentials::example_for(Role::Student).password);
        assert!(user
            .verify_password(Credentials::example_for(Role::Student).password)
            .unwrap());
        assert!(!user.verify_password("wrong password").unwrap());
    }

    #[test]
    fn salts_differ() {
        let a = NewUser::new(Credentials::example_for(Role::Admin), Role::Admin).unwrap();
        let b = NewUser::new(Credentials::example_for(Role::Admin), Role::Admin).unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }
}
