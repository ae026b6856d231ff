//! Price alert creation guard and evaluation against incoming reports.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::error::{FuelError, Result};
use crate::models::{AlertRequest, AlertStatus, PriceAlert, Station, StatusReport};
use crate::notify::Notification;

/// An alert that fired, with the notification to deliver for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTrigger {
    pub alert: PriceAlert,
    pub notification: Notification,
}

/// Lowest price currently known for the alert's scope: the named station, or
/// every station for station-agnostic alerts.
pub fn current_price(request: &AlertRequest, stations: &[Station]) -> Option<f64> {
    stations
        .iter()
        .filter(|s| {
            request
                .station_id
                .as_deref()
                .map_or(true, |id| id == s.id)
        })
        .filter_map(|s| s.price_of(request.fuel_type))
        .min_by(|a, b| a.total_cmp(b))
}

/// Builds a new active alert, rejecting targets that are not strictly below the
/// price known right now. With no known price there is nothing to compare to.
pub fn create_alert(
    request: &AlertRequest,
    current: Option<f64>,
    now: DateTime<Utc>,
) -> Result<PriceAlert> {
    if !request.target_price.is_finite() || request.target_price <= 0.0 {
        return Err(FuelError::Validation(vec![format!(
            "Target price must be a positive number, got {}",
            request.target_price
        )]));
    }
    if let Some(current) = current {
        if request.target_price >= current {
            return Err(FuelError::AlertTarget {
                target: request.target_price,
                current,
            });
        }
    }

    Ok(PriceAlert {
        id: Uuid::new_v4(),
        user_id: request.user_id.clone(),
        station_id: request.station_id.clone(),
        fuel_type: request.fuel_type,
        target_price: request.target_price,
        status: AlertStatus::Active,
        created_at: now,
        triggered_at: None,
    })
}

/// Fires every active alert watching this station and fuel whose target the
/// reported price meets. Fired alerts are moved to `triggered` in place; alerts
/// already triggered are skipped, so a repeat report fires nothing.
pub fn evaluate(
    report: &StatusReport,
    station: &Station,
    alerts: &mut [PriceAlert],
    now: DateTime<Utc>,
) -> Vec<AlertTrigger> {
    let Some(price) = report.price else {
        return Vec::new();
    };

    alerts
        .iter_mut()
        .filter(|a| a.is_active() && a.watches(&report.station_id, report.fuel_type))
        .filter(|a| price <= a.target_price)
        .filter_map(|alert| {
            if !alert.trigger(now) {
                return None;
            }
            Some(AlertTrigger {
                notification: notification_for(alert, station, price),
                alert: alert.clone(),
            })
        })
        .collect()
}

fn notification_for(alert: &PriceAlert, station: &Station, price: f64) -> Notification {
    Notification {
        user_id: alert.user_id.clone(),
        title: format!("{} price drop at {}", capitalize(alert.fuel_type.as_str()), station.name),
        body: format!(
            "{} is now ₦{:.0} at {} (your target: ₦{:.0})",
            alert.fuel_type, price, station.name, alert.target_price
        ),
        metadata: json!({
            "alert_id": alert.id,
            "station_id": station.id,
            "station_name": station.name,
            "fuel_type": alert.fuel_type,
            "price": price,
        }),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
