use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::station::{FuelType, StationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Low,
    Empty,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Low => "low",
            Availability::Empty => "empty",
        }
    }

    /// Operational status implied by this observation.
    pub fn station_status(&self) -> StationStatus {
        match self {
            Availability::Available | Availability::Low => StationStatus::Active,
            Availability::Empty => StationStatus::Inactive,
        }
    }
}

impl FromStr for Availability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Availability::Available),
            "low" => Ok(Availability::Low),
            "empty" => Ok(Availability::Empty),
            other => Err(format!("unknown availability '{}'", other)),
        }
    }
}

/// Who is acting, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    User { user_id: String, display_name: String },
    Guest { display_name: String },
}

impl Identity {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Identity::User { user_id, .. } => Some(user_id),
            Identity::Guest { .. } => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Identity::User { display_name, .. } | Identity::Guest { display_name } => display_name,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User { .. })
    }
}

/// A report as submitted by a client, before validation. Enumerated fields are
/// kept as raw strings so every violation can be reported back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub station_id: String,
    pub fuel_type: String,
    pub availability: String,
    #[serde(default)]
    pub queue_length: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub photo_url: Option<String>,
    pub reporter: Identity,
    /// Set when the user chose to proceed past a duplicate warning.
    #[serde(default)]
    pub confirm_duplicate: bool,
    /// Client session key for answering guests, who have no user id.
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl ReportSubmission {
    pub fn reporter_name(&self) -> &str {
        self.reporter.display_name()
    }

    /// Where feedback about this submission goes: the user id when signed
    /// in, otherwise the client's reply key if it sent one.
    pub fn reply_key(&self) -> Option<&str> {
        self.reporter.user_id().or(self.reply_to.as_deref())
    }
}

/// A validated report ready to be appended; the store assigns id and time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub station_id: String,
    pub fuel_type: FuelType,
    pub availability: Availability,
    pub queue_length: Option<u32>,
    pub price: Option<f64>,
    pub photo_url: Option<String>,
    pub user_id: Option<String>,
    pub reporter_name: String,
    pub quality_score: f64,
}

/// A stored, immutable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: Uuid,
    pub station_id: String,
    pub fuel_type: FuelType,
    pub availability: Availability,
    pub queue_length: Option<u32>,
    pub price: Option<f64>,
    pub photo_url: Option<String>,
    pub user_id: Option<String>,
    pub reporter_name: String,
    pub created_at: DateTime<Utc>,
    pub quality_score: f64,
}

impl StatusReport {
    pub fn from_new(report: NewReport, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            station_id: report.station_id,
            fuel_type: report.fuel_type,
            availability: report.availability,
            queue_length: report.queue_length,
            price: report.price,
            photo_url: report.photo_url,
            user_id: report.user_id,
            reporter_name: report.reporter_name,
            created_at,
            quality_score: report.quality_score,
        }
    }
}
