//! Error taxonomy for core operations. None of these are fatal to the process;
//! each one fails a single operation and is reported to its caller.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FuelError {
    /// Submitted data broke one or more rules. Nothing was written.
    #[error("invalid submission: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Hourly report quota reached; refused until the window rolls over.
    #[error("too many reports ({count}); try again after {}", .reset_time.format("%H:%M UTC"))]
    RateLimited {
        count: usize,
        reset_time: DateTime<Utc>,
    },

    /// Alert target must sit strictly below the price known at creation.
    #[error("alert target {target} must be below the current price {current}")]
    AlertTarget { target: f64, current: f64 },

    #[error("station not found: {0}")]
    StationNotFound(String),

    #[error("price alert not found: {0}")]
    AlertNotFound(Uuid),

    /// Persistence collaborator failure.
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error("geocoding failed: {0}")]
    Geocode(String),
}

impl From<sqlx::Error> for FuelError {
    fn from(e: sqlx::Error) -> Self {
        FuelError::Store {
            source: Box::new(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, FuelError>;
