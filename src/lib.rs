#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod remote;
pub mod session;

use config::{ApiFairing, ConfigFairing};
use logging::LoggerFairing;

/// Assemble the portal: routes, configuration, the election API client and
/// request logging.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(ApiFairing)
        .attach(LoggerFairing)
}

/// A portal talking to the given API instead of the configured one.
#[cfg(test)]
pub(crate) fn rocket_for_api(api: impl remote::ElectionApi + 'static) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("session_ttl", 3600))
        .merge(("jwt_secret", "test-secret"));
    let api: Box<dyn remote::ElectionApi> = Box::new(api);
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(api)
}
