use std::time::Duration;

use log::{error, info};
use mongodb::{error::Error as DbError, options::ClientOptions, Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::store::Stores;

/// Best-effort limit on connecting to and selecting a database server.
pub const DB_TIMEOUT: Duration = Duration::from_secs(10);

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    frontend_origin: String,
}

impl Config {
    /// The frontend origin permitted to make cross-origin calls.
    pub fn frontend_origin(&self) -> &str {
        &self.frontend_origin
    }
}

/// A fairing that loads the application config and puts it in managed state.
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
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
pub struct DbConfig {
    // secrets
    pub db_uri: String,
    // non-secrets
    pub db_name: String,
}

/// Connect to the given MongoDB deployment and select a database.
pub async fn connect(db_uri: &str, db_name: &str) -> Result<Database, DbError> {
    let mut options = ClientOptions::parse(db_uri).await?;
    options.connect_timeout = Some(DB_TIMEOUT);
    options.server_selection_timeout = Some(DB_TIMEOUT);
    let client = MongoClient::with_options(options)?;
    Ok(client.database(db_name))
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures indexes exist, and places the resulting stores and services
/// into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting to `{}`...", config.db_name);

        // Construct the connection.
        let db = match connect(&config.db_uri, &config.db_name).await {
            Ok(db) => db,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };

        // Ensure the required indexes exist. This is also the first real
        // round-trip, so it doubles as a connectivity check.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        Ok(crate::manage_stores(rocket, Stores::mongo(&db)))
    }
}
