pub mod admin;
pub mod auth;
pub mod clubs;
pub mod error;
pub mod health;
pub mod routes;
pub mod users;
