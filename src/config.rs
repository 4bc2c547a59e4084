use chrono::Duration;
use log::{error, info};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    api::auth::Credentials,
    db::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    admin_username: Option<String>,
    // secrets
    jwt_secret: String,
    admin_password: Option<String>,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Credentials for the admin created on first launch, if configured.
    pub fn initial_admin(&self) -> Option<Credentials> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self::example_with_secret("test secret")
    }

    pub fn example_with_secret(secret: &str) -> Self {
        Self {
            auth_ttl: 3600,
            admin_username: None,
            jwt_secret: secret.to_string(),
            admin_password: None,
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    // secrets
    db_uri: String,
}

fn default_db_name() -> String {
    "egov".to_string()
}

/// A fairing that loads the MongoDB config, connects to the database,
/// creates the indexes and the initial admin, and places both a `Client`
/// and a `Database` into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }

        let initial_admin = rocket.state::<Config>().and_then(Config::initial_admin);
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), initial_admin).await {
            error!("Failed to create the initial admin: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_admin_needs_both_credentials() {
        let mut config = Config::example();
        assert!(config.initial_admin().is_none());

        config.admin_username = Some("root".to_string());
        assert!(config.initial_admin().is_none());

        config.admin_password = Some("correct horse battery".to_string());
        let credentials = config.initial_admin().unwrap();
        assert_eq!(credentials.username, "root");
    }

    #[test]
    fn config_is_read_from_figment() {
        let figment = rocket::figment::Figment::from(rocket::Config::default())
            .merge(("jwt_secret", "secret"))
            .merge(("auth_ttl", 60));
        let config: Config = figment.extract().unwrap();
        assert_eq!(config.auth_ttl(), Duration::seconds(60));
        assert_eq!(config.jwt_secret(), b"secret");
        assert!(config.initial_admin().is_none());
    }
}
