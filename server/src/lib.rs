// mapofus-server/src/lib.rs

//! HTTP surface and infrastructure wiring for Map of Us.

pub mod config;
pub mod db;
pub mod errors;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod web;

pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use state::{AppState, StateOptions};
