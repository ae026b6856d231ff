use serde::{Deserialize, Deserializer, Serialize};

use super::price_alert::AlertRequest;
use super::report::{Identity, ReportSubmission};
use crate::geo::GeoPoint;
use uuid::Uuid;

/// Envelope for everything arriving on the events topic.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    LocationFix(LocationFix),
    SubmitReport(ReportSubmission),
    CreateAlert(AlertRequest),
    DeleteAlert { alert_id: Uuid, user_id: String },
    RegisterStation(StationDraft),
    VerifyStation {
        station_id: String,
        user_id: String,
        vote: Vote,
    },
    PurgeOutOfRegion,
}

/// A device location update. Coordinates may arrive as numbers or strings.
#[derive(Debug, Deserialize)]
pub struct LocationFix {
    pub identity: Identity,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lng: Option<f64>,
}

impl LocationFix {
    pub fn point(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint::new(lat, lng))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationDraft {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Confirm,
    Flag,
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    let v: Option<StringOrFloat> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        Some(StringOrFloat::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}
