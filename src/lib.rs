//! Crowd-sourced fuel availability tracking for Lagos: nearest-station
//! resolution, report verification and price alerts.

pub mod alerts;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod kafka;
pub mod models;
pub mod notify;
pub mod processor;
pub mod resolver;
pub mod stations;
pub mod verification;

pub use error::{FuelError, Result};
