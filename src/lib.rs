#![feature(proc_macro_hygiene)]
#![feature(decl_macro)]

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

use rocket::config::{Environment, LoggingLevel};
use rocket::{catchers, Rocket};

use rocket_contrib::templates::Template;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod render;
pub mod routes;
pub mod schema;
pub mod validators;
pub mod views;

pub use crate::config::Config;
pub use crate::error::{Error, Result};

use crate::models::Database;

/// Create a new server instance from a configuration.
///
/// This opens the database pool and runs any pending migrations before
/// returning.
pub fn new_instance(config: Config) -> Result<Rocket> {
    let environment = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };

    // Logging is handled by fern, see `logging::init`.
    let rocket_config = rocket::Config::build(environment)
        .address(config.address.clone())
        .port(config.port)
        .log_level(LoggingLevel::Off)
        .extra(
            "template_dir",
            config.template_dir.to_string_lossy().into_owned(),
        )
        .finalize()?;

    let database = Database::open(&config.database_url)?;

    Ok(rocket::custom(rocket_config)
        .mount("/", routes::routes())
        .register(catchers![
            routes::bad_request,
            routes::unauthorized,
            routes::not_found,
            routes::unprocessable_entity,
            routes::internal_error,
        ])
        .manage(database)
        .manage(config)
        .attach(Template::fairing()))
}
