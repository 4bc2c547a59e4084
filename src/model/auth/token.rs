use std::marker::PhantomData;
use std::ops::Deref;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, GuardFailure, Result};
use crate::model::{
    db::User,
    mongodb::{Coll, Id},
};

use super::role::{Admins, Role, RoleSet, Staff};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token: the session of a specific user with a specific role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub role: Role,
}

impl AuthToken {
    /// Create a new [`AuthToken`] for the given user, carrying their current role.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }

    /// The single authorization check: succeed iff this session's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "The {} role may not perform this action",
                self.role
            )))
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|data: TokenData<Claims>| data.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Fail a guard, remembering the reason so the catcher can report it.
fn reject<S>(req: &Request<'_>, status: Status, error: Error) -> Outcome<S, Error> {
    req.local_cache(|| GuardFailure(Some(error.message())));
    Outcome::Failure((status, error))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and check the user still exists.
    /// The role is refreshed from the database, so demotions apply immediately.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return reject(
                    req,
                    Status::Unauthorized,
                    Error::Unauthorized("You must be signed in".to_string()),
                )
            }
        };

        let token = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return reject(req, Status::Unauthorized, e),
        };

        // Unwrap is safe as the `Database` is always managed.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await
        {
            Ok(Some(user)) => Outcome::Success(Self::new(&user)),
            Ok(None) => reject(
                req,
                Status::Unauthorized,
                Error::Unauthorized("Session user no longer exists".to_string()),
            ),
            Err(e) => reject(req, Status::InternalServerError, e.into()),
        }
    }
}

/// A session whose role is in the role set `R`.
///
/// Failing the role check yields 403 before any request body is read.
pub struct Authorized<R> {
    token: AuthToken,
    phantom: PhantomData<R>,
}

/// A moderator or admin session.
pub type Privileged = Authorized<Staff>;

/// An admin session.
pub type AdminOnly = Authorized<Admins>;

impl<R> Deref for Authorized<R> {
    type Target = AuthToken;

    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for Authorized<R>
where
    R: RoleSet + Send + Sync,
{
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken>().await);
        match token.require_role(R::ALLOWED) {
            Ok(()) => Outcome::Success(Self {
                token,
                phantom: PhantomData,
            }),
            Err(e) => reject(req, Status::Forbidden, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(role: Role) -> AuthToken {
        AuthToken { id: Id::new(), role }
    }

    #[test]
    fn require_role_checks_membership() {
        assert!(token(Role::Admin).require_role(Staff::ALLOWED).is_ok());
        assert!(token(Role::Moderator).require_role(Staff::ALLOWED).is_ok());
        assert!(matches!(
            token(Role::Student).require_role(Staff::ALLOWED),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(
            token(Role::Moderator).require_role(Admins::ALLOWED),
            Err(Error::Forbidden(_))
        ));
        assert!(token(Role::Student).require_role(&[]).is_err());
    }

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let original = token(Role::Moderator);
        let cookie = original.into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));

        let decoded = AuthToken::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn cookie_signed_with_another_secret_is_rejected() {
        let cookie = token(Role::Admin).into_cookie(&Config::example());
        let other = Config::example_with_secret("a completely different secret");
        assert!(matches!(
            AuthToken::from_cookie(&cookie, &other),
            Err(Error::Jwt(_))
        ));
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let config = Config::example();
        let cookie = Cookie::new(AUTH_TOKEN_COOKIE, "definitely.not.ajwt");
        assert!(AuthToken::from_cookie(&cookie, &config).is_err());
    }
}
