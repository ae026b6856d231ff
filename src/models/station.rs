use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Premium,
    Gas,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "petrol",
            FuelType::Diesel => "diesel",
            FuelType::Premium => "premium",
            FuelType::Gas => "gas",
        }
    }

    /// Plausible Naira price range for this fuel, if one is enforced.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        match self {
            FuelType::Petrol => Some((500.0, 2000.0)),
            FuelType::Diesel => Some((600.0, 2500.0)),
            FuelType::Premium => Some((700.0, 2500.0)),
            FuelType::Gas => None,
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "petrol" => Ok(FuelType::Petrol),
            "diesel" => Ok(FuelType::Diesel),
            "premium" => Ok(FuelType::Premium),
            "gas" => Ok(FuelType::Gas),
            other => Err(format!("unknown fuel type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    Active,
    Inactive,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationStatus::Active => "active",
            StationStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for StationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StationStatus::Active),
            "inactive" => Ok(StationStatus::Inactive),
            other => Err(format!("unknown station status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Short,
    #[serde(alias = "mild")]
    Medium,
    Long,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Short => "short",
            QueueStatus::Medium => "medium",
            QueueStatus::Long => "long",
        }
    }

    /// Buckets an observed wait in minutes.
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0..=14 => QueueStatus::Short,
            15..=45 => QueueStatus::Medium,
            _ => QueueStatus::Long,
        }
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(QueueStatus::Short),
            "medium" | "mild" => Ok(QueueStatus::Medium),
            "long" => Ok(QueueStatus::Long),
            other => Err(format!("unknown queue status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: StationStatus,
    pub queue_status: Option<QueueStatus>,
    pub prices: HashMap<FuelType, f64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_reporter: Option<String>,
    pub confirmed_by: BTreeSet<String>,
    pub flagged_by: BTreeSet<String>,
    pub photo_url: Option<String>,
}

impl Station {
    pub fn new(id: impl Into<String>, name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            lat: None,
            lng: None,
            status: StationStatus::Active,
            queue_status: None,
            prices: HashMap::new(),
            last_updated: None,
            last_reporter: None,
            confirmed_by: BTreeSet::new(),
            flagged_by: BTreeSet::new(),
            photo_url: None,
        }
    }

    pub fn with_position(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn with_status(mut self, status: StationStatus) -> Self {
        self.set_status(status);
        self
    }

    pub fn with_price(mut self, fuel: FuelType, price: f64) -> Self {
        self.prices.insert(fuel, price);
        self
    }

    /// Position, only when both coordinates are present and finite.
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint::new(lat, lng))
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == StationStatus::Active
    }

    /// Changes operational status; an inactive station has no queue.
    pub fn set_status(&mut self, status: StationStatus) {
        self.status = status;
        if status == StationStatus::Inactive {
            self.queue_status = None;
        }
    }

    pub fn price_of(&self, fuel: FuelType) -> Option<f64> {
        self.prices.get(&fuel).copied()
    }

    /// Records a confirming vote, withdrawing any flag by the same user.
    /// Returns false when the vote was already recorded.
    pub fn confirm(&mut self, user_id: &str) -> bool {
        self.flagged_by.remove(user_id);
        self.confirmed_by.insert(user_id.to_string())
    }

    /// Records a flag, withdrawing any confirmation by the same user.
    pub fn flag(&mut self, user_id: &str) -> bool {
        self.confirmed_by.remove(user_id);
        self.flagged_by.insert(user_id.to_string())
    }
}
