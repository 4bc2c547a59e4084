use rocket::{serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{UserDescription, UserSpec},
        auth::AdminOnly,
        db::User,
        mongodb::Coll,
    },
};

use super::common::insert_user;

pub fn routes() -> Vec<Route> {
    routes![create_user]
}

/// Create a user with any role, e.g. a moderator.
#[post("/users", data = "<spec>")]
async fn create_user(
    _token: AdminOnly,
    spec: Json<UserSpec>,
    users: Coll<User>,
) -> Result<Json<UserDescription>> {
    let (credentials, role) = spec.into_inner().validate().map_err(Error::Validation)?;
    let user = insert_user(&users, credentials, role).await?;
    Ok(Json(user.into()))
}
