use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::auth::{Credentials, UserDescription},
        auth::{AuthToken, Role, AUTH_TOKEN_COOKIE},
        db::User,
        mongodb::Coll,
    },
};

use super::common::insert_user;

pub fn routes() -> Vec<Route> {
    routes![login, register, me, logout]
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    let with_username = doc! {
        "username": &credentials.username,
    };
    let user = match users.find_one(with_username, None).await? {
        Some(user) if user.verify_password(&credentials.password)? => user,
        _ => {
            return Err(Error::Unauthorized(
                "No user found with the provided username and password combination".to_string(),
            ))
        }
    };

    cookies.add(AuthToken::new(&user).into_cookie(config));
    Ok(Json(user.into()))
}

/// Create a student account and sign in as it.
#[post("/auth/register", data = "<credentials>", format = "json")]
async fn register(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    credentials.validate().map_err(Error::Validation)?;
    let user = insert_user(&users, credentials.into_inner(), Role::Student).await?;

    cookies.add(AuthToken::new(&user).into_cookie(config));
    Ok(Json(user.into()))
}

#[get("/auth/me")]
async fn me(token: AuthToken, users: Coll<User>) -> Result<Json<UserDescription>> {
    let user = users
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", token.id)))?;
    Ok(Json(user.into()))
}

#[delete("/auth")]
async fn logout(cookies: &CookieJar<'_>) {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::api::testing::json;

    use super::*;

    async fn post_credentials(client: &Client, uri: &str, credentials: &Credentials) -> Status {
        client
            .post(uri)
            .header(ContentType::JSON)
            .body(serde_json::to_string(credentials).unwrap())
            .dispatch()
            .await
            .status()
    }

    #[backend_test]
    async fn register_then_login(client: Client, users: Coll<User>) {
        let credentials = Credentials {
            username: "new.student".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        assert_eq!(
            Status::Ok,
            post_credentials(&client, "/auth/register", &credentials).await
        );
        let me: UserDescription = json(client.get(uri!(me)).dispatch().await).await;
        assert_eq!(me.username, "new.student");
        assert_eq!(me.role, "student");

        let stored = users
            .find_one(doc! { "username": "new.student" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, credentials.password);

        // Sign out, then back in.
        client.delete(uri!(logout)).dispatch().await;
        assert_eq!(
            Status::Unauthorized,
            client.get(uri!(me)).dispatch().await.status()
        );
        assert_eq!(
            Status::Ok,
            post_credentials(&client, "/auth/login", &credentials).await
        );
        assert_eq!(Status::Ok, client.get(uri!(me)).dispatch().await.status());

        // The username is now taken.
        assert_eq!(
            Status::BadRequest,
            post_credentials(&client, "/auth/register", &credentials).await
        );
    }

    #[backend_test]
    async fn bad_login(client: Client, db: Database) {
        crate::api::testing::login(&client, &db, Role::Student).await;
        crate::api::testing::logout(&client).await;

        let mut credentials = Credentials::example_for(Role::Student);
        credentials.password = "not the password".to_string();
        assert_eq!(
            Status::Unauthorized,
            post_credentials(&client, "/auth/login", &credentials).await
        );

        credentials.username = "nobody".to_string();
        assert_eq!(
            Status::Unauthorized,
            post_credentials(&client, "/auth/login", &credentials).await
        );
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_none());
    }

    #[backend_test]
    async fn weak_credentials_are_rejected(client: Client, users: Coll<User>) {
        let credentials = Credentials {
            username: "x".to_string(),
            password: "short".to_string(),
        };
        assert_eq!(
            Status::BadRequest,
            post_credentials(&client, "/auth/register", &credentials).await
        );
        assert_eq!(users.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test(student)]
    async fn deleted_users_lose_their_session(client: Client, users: Coll<User>) {
        assert_eq!(Status::Ok, client.get(uri!(me)).dispatch().await.status());
        users.delete_many(doc! {}, None).await.unwrap();
        assert_eq!(
            Status::Unauthorized,
            client.get(uri!(me)).dispatch().await.status()
        );
    }
}
