use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::station::FuelType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Triggered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Triggered => "triggered",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "triggered" => Ok(AlertStatus::Triggered),
            other => Err(format!("unknown alert status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: Uuid,
    pub user_id: String,
    /// `None` watches every station.
    pub station_id: Option<String>,
    pub fuel_type: FuelType,
    pub target_price: f64,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

impl PriceAlert {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn watches(&self, station_id: &str, fuel: FuelType) -> bool {
        self.fuel_type == fuel
            && self
                .station_id
                .as_deref()
                .map_or(true, |watched| watched == station_id)
    }

    /// `active -> triggered`. Returns false if the alert was already terminal.
    pub fn trigger(&mut self, at: DateTime<Utc>) -> bool {
        match self.status {
            AlertStatus::Active => {
                self.status = AlertStatus::Triggered;
                self.triggered_at = Some(at);
                true
            }
            AlertStatus::Triggered => false,
        }
    }
}

/// A user request to create an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub user_id: String,
    #[serde(default)]
    pub station_id: Option<String>,
    pub fuel_type: FuelType,
    pub target_price: f64,
}
