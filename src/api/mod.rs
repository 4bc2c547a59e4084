use rocket::Route;

mod auth;
mod common;
mod polls;
mod surveys;
mod users;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(users::routes());
    routes.extend(polls::routes());
    routes.extend(surveys::routes());
    routes
}

/// Helpers for endpoint tests.
#[cfg(test)]
pub(crate) mod testing {
    use mongodb::{bson::doc, Database};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json,
    };
    use serde::de::DeserializeOwned;

    use crate::model::{
        api::auth::Credentials,
        auth::Role,
        db::{NewUser, User},
        mongodb::Coll,
    };

    /// Sign the client in as the example user for `role`, creating them if needed.
    pub(crate) async fn login(client: &Client, db: &Database, role: Role) -> User {
        let credentials = Credentials::example_for(role);
        let users = Coll::<User>::from_db(db);
        let existing = users
            .find_one(doc! { "username": &credentials.username }, None)
            .await
            .unwrap();
        let user = match existing {
            Some(user) => user,
            None => {
                let user = User::new(NewUser::new(credentials.clone(), role).unwrap());
                users.insert_one(&user, None).await.unwrap();
                user
            }
        };

        let response = client
            .post("/auth/login")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&credentials).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        user
    }

    /// Sign the client out.
    pub(crate) async fn logout(client: &Client) {
        let response = client.delete("/auth").dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }

    /// Deserialise a JSON response body.
    pub(crate) async fn json<T: DeserializeOwned>(
        response: rocket::local::asynchronous::LocalResponse<'_>,
    ) -> T {
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }
}
