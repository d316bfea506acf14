#[macro_use]
extern crate rocket;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod advisory;
pub mod bot;
pub mod configuration;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod listening_port;
pub mod models;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod startup;
pub mod telegram;
pub mod telemetry;
pub mod weather;
