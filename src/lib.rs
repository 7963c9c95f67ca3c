#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{figment::Figment, Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing};
use crate::cors::CorsFairing;
use crate::logging::LoggerFairing;
use crate::service::{QueryService, VotingService};
use crate::store::Stores;

pub mod api;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

/// The production server: configuration from `Rocket.toml`, MongoDB-backed stores.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(CorsFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes())
}

/// Put the services built on `stores` into managed state.
pub fn manage_stores(rocket: Rocket<Build>, stores: Stores) -> Rocket<Build> {
    rocket
        .manage(VotingService::new(stores.clone()))
        .manage(QueryService::new(stores))
}

/// A server using the given configuration and stores, skipping the database fairing.
pub fn rocket_for_stores(figment: Figment, stores: Stores) -> Rocket<Build> {
    let rocket = rocket::custom(figment)
        .attach(ConfigFairing)
        .attach(CorsFairing)
        .attach(LoggerFairing)
        .mount("/", api::routes());
    manage_stores(rocket, stores)
}

#[cfg(test)]
pub(crate) const TEST_FRONTEND_ORIGIN: &str = "http://frontend.test";

#[cfg(test)]
fn test_figment() -> Figment {
    rocket::Config::figment().merge(("frontend_origin", TEST_FRONTEND_ORIGIN))
}

/// A tracked client for a fresh server over the given stores.
#[cfg(test)]
pub(crate) async fn client_for_stores(stores: &Stores) -> rocket::local::asynchronous::Client {
    rocket::local::asynchronous::Client::tracked(rocket_for_stores(test_figment(), stores.clone()))
        .await
        .unwrap()
}

/// A uniquely named database on the configured test server.
#[cfg(test)]
pub(crate) async fn test_database() -> mongodb::Database {
    let db_uri = test_figment()
        .extract_inner::<String>("db_uri")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!("test{}", rand::random::<u32>());
    config::connect(&db_uri, &db_name).await.unwrap()
}
