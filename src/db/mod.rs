use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    FuelType, NewReport, PriceAlert, QueueStatus, Station, StationStatus, StatusReport,
};
use crate::notify::{Notification, NotificationSink, PresenceIntent, PresenceSink};

#[cfg(test)]
pub mod memory;
pub mod pg;
pub mod queries;

pub use pg::PgStore;

pub type DbPool = Pool<Postgres>;

pub async fn init_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Fields a status report writes back onto its station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationUpdate {
    pub station_id: String,
    pub status: StationStatus,
    pub queue_status: Option<QueueStatus>,
    pub price: Option<(FuelType, f64)>,
    pub last_updated: DateTime<Utc>,
    pub last_reporter: String,
    pub photo_url: Option<String>,
}

impl StationUpdate {
    /// Station fields implied by a freshly stored report.
    pub fn for_report(station: &Station, report: &StatusReport) -> Self {
        let status = report.availability.station_status();
        let queue_status = match status {
            StationStatus::Inactive => None,
            StationStatus::Active => report
                .queue_length
                .map(QueueStatus::from_minutes)
                .or(station.queue_status),
        };

        Self {
            station_id: station.id.clone(),
            status,
            queue_status,
            price: report.price.map(|p| (report.fuel_type, p)),
            last_updated: report.created_at,
            last_reporter: report.reporter_name.clone(),
            photo_url: report.photo_url.clone(),
        }
    }
}

/// The station/report/alert store. Reads are point-in-time snapshots; the core
/// computes on them and hands back write intents.
#[async_trait]
pub trait FuelStore: Send + Sync {
    /// Authoritative clock used for report timestamps and window checks.
    async fn server_time(&self) -> Result<DateTime<Utc>>;

    async fn list_stations(&self) -> Result<Vec<Station>>;
    async fn get_station(&self, station_id: &str) -> Result<Option<Station>>;
    async fn insert_station(&self, station: &Station) -> Result<()>;
    async fn set_verification(&self, station: &Station) -> Result<()>;
    async fn delete_station(&self, station_id: &str) -> Result<()>;

    /// Appends a report and writes its effect onto `station` in one
    /// transaction. The store assigns the report's id and timestamp; either
    /// both writes land or neither does.
    async fn append_report_and_update(
        &self,
        report: NewReport,
        station: &Station,
    ) -> Result<StatusReport>;
    async fn reports_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusReport>>;

    /// Active alerts on this station or on any station, for this fuel.
    async fn active_alerts_for(&self, station_id: &str, fuel: FuelType)
        -> Result<Vec<PriceAlert>>;
    async fn create_alert(&self, alert: &PriceAlert) -> Result<()>;
    /// `active -> triggered`, guarded on the stored status. Returns false when
    /// the alert was no longer active, e.g. another consumer got there first.
    async fn mark_alert_triggered(&self, alert: &PriceAlert) -> Result<bool>;
    /// Deletes an alert owned by `user_id`. Returns false if none matched.
    async fn delete_alert(&self, alert_id: Uuid, user_id: &str) -> Result<bool>;

    async fn record_presence(&self, intent: &PresenceIntent) -> Result<()>;
    async fn enqueue_notification(&self, notification: &Notification) -> Result<()>;
}

/// Notifications land in the store's outbox for a delivery worker to pick up.
pub struct OutboxNotifier<S: ?Sized>(pub Arc<S>);

#[async_trait]
impl<S: FuelStore + ?Sized> NotificationSink for OutboxNotifier<S> {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.0.enqueue_notification(notification).await
    }
}

/// Presence rows written straight to the store.
pub struct StorePresence<S: ?Sized>(pub Arc<S>);

#[async_trait]
impl<S: FuelStore + ?Sized> PresenceSink for StorePresence<S> {
    async fn record_presence(&self, intent: &PresenceIntent) -> Result<()> {
        self.0.record_presence(intent).await
    }
}
