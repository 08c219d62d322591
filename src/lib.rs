pub mod aliases;
pub mod api;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod consumers;
pub mod db;
pub mod domain;
pub mod events;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod outbox;
pub mod routes;
pub mod schema;
pub mod swagger;
pub mod workers;
