use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use std::collections::HashMap;
use uuid::Uuid;

use super::{queries, DbPool, FuelStore, StationUpdate};
use crate::error::{FuelError, Result};
use crate::models::{FuelType, NewReport, PriceAlert, QueueStatus, Station, StatusReport};
use crate::notify::{Notification, PresenceIntent};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_error(message: String) -> FuelError {
    FuelError::Store {
        source: message.into(),
    }
}

#[derive(Debug, FromRow)]
struct StationRow {
    station_id: String,
    name: String,
    address: String,
    lat: Option<f64>,
    lng: Option<f64>,
    status: String,
    queue_status: Option<String>,
    prices: Json<HashMap<FuelType, f64>>,
    last_updated: Option<DateTime<Utc>>,
    last_reporter: Option<String>,
    confirmed_by: Vec<String>,
    flagged_by: Vec<String>,
    photo_url: Option<String>,
}

impl TryFrom<StationRow> for Station {
    type Error = FuelError;

    fn try_from(row: StationRow) -> Result<Self> {
        Ok(Station {
            id: row.station_id,
            name: row.name,
            address: row.address,
            lat: row.lat,
            lng: row.lng,
            status: row.status.parse().map_err(decode_error)?,
            queue_status: row
                .queue_status
                .as_deref()
                .map(str::parse::<QueueStatus>)
                .transpose()
                .map_err(decode_error)?,
            prices: row.prices.0,
            last_updated: row.last_updated,
            last_reporter: row.last_reporter,
            confirmed_by: row.confirmed_by.into_iter().collect(),
            flagged_by: row.flagged_by.into_iter().collect(),
            photo_url: row.photo_url,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    report_id: Uuid,
    station_id: String,
    fuel_type: String,
    availability: String,
    queue_length: Option<i32>,
    price: Option<f64>,
    photo_url: Option<String>,
    user_id: Option<String>,
    reporter_name: String,
    quality_score: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for StatusReport {
    type Error = FuelError;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(StatusReport {
            id: row.report_id,
            station_id: row.station_id,
            fuel_type: row.fuel_type.parse().map_err(decode_error)?,
            availability: row.availability.parse().map_err(decode_error)?,
            queue_length: row.queue_length.and_then(|q| u32::try_from(q).ok()),
            price: row.price,
            photo_url: row.photo_url,
            user_id: row.user_id,
            reporter_name: row.reporter_name,
            created_at: row.created_at,
            quality_score: row.quality_score,
        })
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    alert_id: Uuid,
    user_id: String,
    station_id: Option<String>,
    fuel_type: String,
    target_price: f64,
    status: String,
    created_at: DateTime<Utc>,
    triggered_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRow> for PriceAlert {
    type Error = FuelError;

    fn try_from(row: AlertRow) -> Result<Self> {
        Ok(PriceAlert {
            id: row.alert_id,
            user_id: row.user_id,
            station_id: row.station_id,
            fuel_type: row.fuel_type.parse().map_err(decode_error)?,
            target_price: row.target_price,
            status: row.status.parse().map_err(decode_error)?,
            created_at: row.created_at,
            triggered_at: row.triggered_at,
        })
    }
}

#[async_trait]
impl FuelStore for PgStore {
    async fn server_time(&self) -> Result<DateTime<Utc>> {
        let row = sqlx::query(queries::SELECT_NOW)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("now")?)
    }

    async fn list_stations(&self) -> Result<Vec<Station>> {
        let rows: Vec<StationRow> = sqlx::query_as(queries::SELECT_STATIONS)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Station::try_from).collect()
    }

    async fn get_station(&self, station_id: &str) -> Result<Option<Station>> {
        let row: Option<StationRow> = sqlx::query_as(queries::SELECT_STATION)
            .bind(station_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Station::try_from).transpose()
    }

    async fn insert_station(&self, station: &Station) -> Result<()> {
        sqlx::query(queries::INSERT_STATION)
            .bind(&station.id)
            .bind(&station.name)
            .bind(&station.address)
            .bind(station.lat)
            .bind(station.lng)
            .bind(station.status.as_str())
            .bind(station.queue_status.map(|q| q.as_str()))
            .bind(Json(&station.prices))
            .bind(station.last_updated)
            .bind(&station.last_reporter)
            .bind(station.confirmed_by.iter().cloned().collect::<Vec<_>>())
            .bind(station.flagged_by.iter().cloned().collect::<Vec<_>>())
            .bind(&station.photo_url)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_verification(&self, station: &Station) -> Result<()> {
        sqlx::query(queries::UPDATE_STATION_VERIFICATION)
            .bind(&station.id)
            .bind(station.confirmed_by.iter().cloned().collect::<Vec<_>>())
            .bind(station.flagged_by.iter().cloned().collect::<Vec<_>>())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_station(&self, station_id: &str) -> Result<()> {
        sqlx::query(queries::DELETE_STATION)
            .bind(station_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_report_and_update(
        &self,
        report: NewReport,
        station: &Station,
    ) -> Result<StatusReport> {
        let mut tx = self.pool.begin().await?;

        let report_id = Uuid::new_v4();
        let row = sqlx::query(queries::INSERT_REPORT)
            .bind(report_id)
            .bind(&report.station_id)
            .bind(report.fuel_type.as_str())
            .bind(report.availability.as_str())
            .bind(report.queue_length.map(|q| q as i32))
            .bind(report.price)
            .bind(&report.photo_url)
            .bind(&report.user_id)
            .bind(&report.reporter_name)
            .bind(report.quality_score)
            .fetch_one(&mut *tx)
            .await?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let report = StatusReport::from_new(report, report_id, created_at);

        let update = StationUpdate::for_report(station, &report);
        let price_patch: Value = match update.price {
            Some((fuel, price)) => json!({ fuel.as_str(): price }),
            None => json!({}),
        };

        sqlx::query(queries::UPDATE_STATION_STATUS)
            .bind(&update.station_id)
            .bind(update.status.as_str())
            .bind(update.queue_status.map(|q| q.as_str()))
            .bind(Json(price_patch))
            .bind(update.last_updated)
            .bind(&update.last_reporter)
            .bind(&update.photo_url)
            .execute(&mut *tx)
            .await?;

        // Dropping the transaction on an early return rolls back the insert
        tx.commit().await?;

        Ok(report)
    }

    async fn reports_by_user_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<StatusReport>> {
        let rows: Vec<ReportRow> = sqlx::query_as(queries::SELECT_USER_REPORTS_SINCE)
            .bind(user_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(StatusReport::try_from).collect()
    }

    async fn active_alerts_for(
        &self,
        station_id: &str,
        fuel: FuelType,
    ) -> Result<Vec<PriceAlert>> {
        let rows: Vec<AlertRow> = sqlx::query_as(queries::SELECT_ACTIVE_ALERTS)
            .bind(station_id)
            .bind(fuel.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PriceAlert::try_from).collect()
    }

    async fn create_alert(&self, alert: &PriceAlert) -> Result<()> {
        sqlx::query(queries::INSERT_ALERT)
            .bind(alert.id)
            .bind(&alert.user_id)
            .bind(&alert.station_id)
            .bind(alert.fuel_type.as_str())
            .bind(alert.target_price)
            .bind(alert.status.as_str())
            .bind(alert.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_alert_triggered(&self, alert: &PriceAlert) -> Result<bool> {
        let result = sqlx::query(queries::UPDATE_ALERT_TRIGGERED)
            .bind(alert.id)
            .bind(alert.triggered_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_alert(&self, alert_id: Uuid, user_id: &str) -> Result<bool> {
        let result = sqlx::query(queries::DELETE_ALERT)
            .bind(alert_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_presence(&self, intent: &PresenceIntent) -> Result<()> {
        sqlx::query(queries::INSERT_PRESENCE)
            .bind(&intent.station_id)
            .bind(&intent.user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn enqueue_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(queries::INSERT_NOTIFICATION)
            .bind(Uuid::new_v4())
            .bind(&notification.user_id)
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(Json(&notification.metadata))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
