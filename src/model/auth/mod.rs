mod role;
mod token;

pub use role::{Admins, Role, RoleSet, Staff};
pub use token::{AdminOnly, AuthToken, Authorized, Privileged, AUTH_TOKEN_COOKIE};
