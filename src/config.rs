use std::time::Duration as StdDuration;

use chrono::Duration;
use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{dashboard::DashboardSession, session::VotingSession};
use crate::remote::{ElectionApi, HttpElectionApi};
use crate::session::SessionStore;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    session_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// How long an idle voting or dashboard session survives, in seconds.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl.into())
    }

    /// Secret key used to sign session cookies.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state,
/// along with the (empty) session stores sized by it.
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

        let ttl = config.session_ttl();
        info!("Sessions expire after {} idle seconds", ttl.num_seconds());

        // Manage the state.
        rocket = rocket
            .manage(SessionStore::<VotingSession>::new(ttl))
            .manage(SessionStore::<DashboardSession>::new(ttl))
            .manage(config);
        Ok(rocket)
    }
}

/// Configuration for the remote election API.
#[derive(Deserialize)]
struct ApiConfig {
    api_url: String,
    /// Seconds before a call to the API is abandoned.
    api_timeout: u64,
}

/// A fairing that loads the election API config and places a client for it
/// into managed state as a `Box<dyn ElectionApi>`.
pub struct ApiFairing;

#[rocket::async_trait]
impl Fairing for ApiFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election API",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<ApiConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load election API config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the client.
        let timeout = StdDuration::from_secs(config.api_timeout);
        let api = match HttpElectionApi::new(&config.api_url, timeout) {
            Ok(api) => api,
            Err(e) => {
                error!("Failed to build election API client: {e}");
                return Err(rocket);
            }
        };
        info!("Using election API at {}", config.api_url);

        // Manage the state.
        let api: Box<dyn ElectionApi> = Box::new(api);
        rocket = rocket.manage(api);
        Ok(rocket)
    }
}
