//! In-process store used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::{FuelStore, StationUpdate};
use crate::error::{FuelError, Result};
use crate::models::{AlertStatus, FuelType, NewReport, PriceAlert, Station, StatusReport};
use crate::notify::{Notification, PresenceIntent};

#[derive(Default)]
pub struct MemoryStore {
    pub stations: Mutex<Vec<Station>>,
    pub reports: Mutex<Vec<StatusReport>>,
    pub alerts: Mutex<Vec<PriceAlert>>,
    pub presence: Mutex<Vec<PresenceIntent>>,
    pub outbox: Mutex<Vec<Notification>>,
    /// Server clock; advanced by one second per appended report.
    pub clock: Mutex<Option<DateTime<Utc>>>,
    pub fail_notifications: bool,
    /// Station writes fail; the report append must not survive alone.
    pub fail_station_updates: bool,
    /// Alert reads ignore status, like a replica that has not yet seen
    /// another consumer's trigger.
    pub stale_alert_reads: bool,
}

impl MemoryStore {
    pub fn with_stations(stations: Vec<Station>) -> Self {
        Self {
            stations: Mutex::new(stations),
            ..Default::default()
        }
    }

    pub fn station(&self, station_id: &str) -> Option<Station> {
        self.stations
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == station_id)
            .cloned()
    }

    pub fn set_clock(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = Some(now);
    }

    fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap().get_or_insert_with(Utc::now)
    }
}

#[async_trait]
impl FuelStore for MemoryStore {
    async fn server_time(&self) -> Result<DateTime<Utc>> {
        Ok(self.now())
    }

    async fn list_stations(&self) -> Result<Vec<Station>> {
        Ok(self.stations.lock().unwrap().clone())
    }

    async fn get_station(&self, station_id: &str) -> Result<Option<Station>> {
        Ok(self.station(station_id))
    }

    async fn insert_station(&self, station: &Station) -> Result<()> {
        self.stations.lock().unwrap().push(station.clone());
        Ok(())
    }

    async fn set_verification(&self, station: &Station) -> Result<()> {
        let mut stations = self.stations.lock().unwrap();
        if let Some(stored) = stations.iter_mut().find(|s| s.id == station.id) {
            stored.confirmed_by = station.confirmed_by.clone();
            stored.flagged_by = station.flagged_by.clone();
        }
        Ok(())
    }

    async fn delete_station(&self, station_id: &str) -> Result<()> {
        self.stations.lock().unwrap().retain(|s| s.id != station_id);
        Ok(())
    }

    async fn append_report_and_update(
        &self,
        report: NewReport,
        station: &Station,
    ) -> Result<StatusReport> {
        if self.fail_station_updates {
            return Err(FuelError::Store {
                source: "station update failed".into(),
            });
        }
        let mut stations = self.stations.lock().unwrap();
        let stored_station = stations
            .iter_mut()
            .find(|s| s.id == station.id)
            .ok_or_else(|| FuelError::StationNotFound(station.id.clone()))?;

        let created_at = self.now();
        self.set_clock(created_at + Duration::seconds(1));
        let stored = StatusReport::from_new(report, Uuid::new_v4(), created_at);

        let update = StationUpdate::for_report(station, &stored);
        stored_station.set_status(update.status);
        stored_station.queue_status = update.queue_status;
        if let Some((fuel, price)) = update.price {
            stored_station.prices.insert(fuel, price);
        }
        stored_station.last_updated = Some(update.last_updated);
        stored_station.last_reporter = Some(update.last_reporter);
        if update.photo_url.is_some() {
            stored_station.photo_url = update.photo_url;
        }

        self.reports.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn reports_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusReport>> {
        Ok(self
            .reports
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id) && r.created_at >= since)
            .cloned()
            .collect())
    }

    async fn active_alerts_for(
        &self,
        station_id: &str,
        fuel: FuelType,
    ) -> Result<Vec<PriceAlert>> {
        let alerts = self.alerts.lock().unwrap();
        let watching = alerts.iter().filter(|a| a.watches(station_id, fuel));
        if self.stale_alert_reads {
            return Ok(watching
                .cloned()
                .map(|mut a| {
                    a.status = AlertStatus::Active;
                    a.triggered_at = None;
                    a
                })
                .collect());
        }
        Ok(watching.filter(|a| a.is_active()).cloned().collect())
    }

    async fn create_alert(&self, alert: &PriceAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn mark_alert_triggered(&self, alert: &PriceAlert) -> Result<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        match alerts
            .iter_mut()
            .find(|a| a.id == alert.id && a.status == AlertStatus::Active)
        {
            Some(stored) => {
                stored.status = AlertStatus::Triggered;
                stored.triggered_at = alert.triggered_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_alert(&self, alert_id: Uuid, user_id: &str) -> Result<bool> {
        let mut alerts = self.alerts.lock().unwrap();
        let before = alerts.len();
        alerts.retain(|a| !(a.id == alert_id && a.user_id == user_id));
        Ok(alerts.len() < before)
    }

    async fn record_presence(&self, intent: &PresenceIntent) -> Result<()> {
        self.presence.lock().unwrap().push(intent.clone());
        Ok(())
    }

    async fn enqueue_notification(&self, notification: &Notification) -> Result<()> {
        if self.fail_notifications {
            return Err(FuelError::Notification("outbox unavailable".to_string()));
        }
        self.outbox.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
