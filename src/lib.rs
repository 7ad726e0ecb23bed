//! Club membership server: accounts, clubs and the membership rules that
//! keep every club manageable.

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod http;
pub mod metrics;
