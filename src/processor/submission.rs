use chrono::Duration;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::alerts::{self, AlertTrigger};
use crate::db::FuelStore;
use crate::error::{FuelError, Result};
use crate::models::{Availability, FuelType, NewReport, ReportSubmission, Station, StatusReport};
use crate::notify::{Notification, NotificationSink};
use crate::verification::{self, duplicate, rate_limit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubmissionPolicy {
    pub duplicate_window_minutes: i64,
    pub max_reports: usize,
    pub rate_window_minutes: i64,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            duplicate_window_minutes: duplicate::DEFAULT_DUPLICATE_WINDOW_MINUTES,
            max_reports: rate_limit::DEFAULT_MAX_REPORTS,
            rate_window_minutes: rate_limit::DEFAULT_RATE_WINDOW_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted {
        report: StatusReport,
        triggered: Vec<AlertTrigger>,
    },
    /// Same user reported this station moments ago; resubmit with
    /// `confirm_duplicate` to proceed.
    NeedsConfirmation { last_report: StatusReport },
}

/// Validation, abuse checks, persistence and alert fan-out for one report.
pub struct ReportPipeline {
    store: Arc<dyn FuelStore>,
    notifier: Arc<dyn NotificationSink>,
    policy: SubmissionPolicy,
}

impl ReportPipeline {
    pub fn new(
        store: Arc<dyn FuelStore>,
        notifier: Arc<dyn NotificationSink>,
        policy: SubmissionPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
        }
    }

    pub async fn submit(&self, submission: ReportSubmission) -> Result<SubmissionOutcome> {
        // 1. Shape and coarse ranges
        let validation = verification::validate(&submission);
        if !validation.valid {
            return Err(FuelError::Validation(validation.errors));
        }
        let fuel_type: FuelType = submission.fuel_type.parse().map_err(one_error)?;
        let availability: Availability = submission.availability.parse().map_err(one_error)?;

        // 2. Fuel-specific price range
        if let Some(price) = submission.price {
            verification::validate_price(fuel_type, price).map_err(one_error)?;
        }

        let station = self
            .store
            .get_station(&submission.station_id)
            .await?
            .ok_or_else(|| FuelError::StationNotFound(submission.station_id.clone()))?;

        // 3. Abuse checks against the store's clock
        if let Some(user_id) = submission.reporter.user_id() {
            let now = self.store.server_time().await?;
            let lookback = self
                .policy
                .rate_window_minutes
                .max(self.policy.duplicate_window_minutes);
            let recent = self
                .store
                .reports_by_user_since(user_id, now - Duration::minutes(lookback))
                .await?;

            let limit = verification::check_limit(
                &submission.reporter,
                &recent,
                now,
                self.policy.max_reports,
                self.policy.rate_window_minutes,
            );
            if limit.exceeded {
                warn!("Rate limit hit for user {} ({} reports)", user_id, limit.count);
                return Err(FuelError::RateLimited {
                    count: limit.count,
                    reset_time: limit
                        .reset_time
                        .unwrap_or(now + Duration::minutes(self.policy.rate_window_minutes)),
                });
            }

            let duplicate = verification::is_duplicate(
                &submission.reporter,
                &station.id,
                &recent,
                now,
                self.policy.duplicate_window_minutes,
            );
            if let Some(last_report) = duplicate.last_report {
                if !submission.confirm_duplicate {
                    info!(
                        "Duplicate report from {} on station {}, asking for confirmation",
                        user_id, station.id
                    );
                    return Ok(SubmissionOutcome::NeedsConfirmation { last_report });
                }
            }
        }

        // 4. Persist
        let quality_score = verification::score(&submission);
        let new_report = NewReport {
            station_id: station.id.clone(),
            fuel_type,
            availability,
            queue_length: submission.queue_length.and_then(|q| u32::try_from(q).ok()),
            price: submission.price,
            photo_url: submission.photo_url.clone(),
            user_id: submission.reporter.user_id().map(str::to_string),
            reporter_name: submission.reporter_name().trim().to_string(),
            quality_score,
        };
        let report = self
            .store
            .append_report_and_update(new_report, &station)
            .await?;

        info!(
            "Accepted {} report {} for station {} (quality {:.2})",
            report.fuel_type, report.id, station.id, report.quality_score
        );

        // 5. Price alerts
        let triggered = self.fire_alerts(&report, &station).await?;

        Ok(SubmissionOutcome::Accepted { report, triggered })
    }

    /// Like [`submit`](Self::submit), but also tells the reporter when the
    /// report was held back or refused. Feedback is best effort.
    pub async fn submit_and_reply(
        &self,
        submission: ReportSubmission,
    ) -> Result<SubmissionOutcome> {
        let recipient = submission.reply_key().map(str::to_string);
        let station_id = submission.station_id.clone();
        let result = self.submit(submission).await;

        let Some(feedback) = feedback_for(&station_id, &result) else {
            return result;
        };
        match recipient {
            Some(recipient) => {
                let notification = Notification {
                    user_id: recipient,
                    ..feedback
                };
                if let Err(e) = self.notifier.notify(&notification).await {
                    warn!(
                        "Could not send submission feedback to {}: {}",
                        notification.user_id, e
                    );
                }
            }
            None => info!(
                "No reply key for guest report on station {}, feedback dropped",
                station_id
            ),
        }
        result
    }

    async fn fire_alerts(
        &self,
        report: &StatusReport,
        station: &Station,
    ) -> Result<Vec<AlertTrigger>> {
        if report.price.is_none() {
            return Ok(Vec::new());
        }

        let mut candidates = self
            .store
            .active_alerts_for(&station.id, report.fuel_type)
            .await?;
        let fired = alerts::evaluate(report, station, &mut candidates, report.created_at);

        // Announce only alerts this call moved to triggered. A failed write or
        // a transition already made by another consumer announces nothing.
        let mut persisted = Vec::with_capacity(fired.len());
        for trigger in fired {
            match self.store.mark_alert_triggered(&trigger.alert).await {
                Ok(true) => persisted.push(trigger),
                Ok(false) => info!("Alert {} was already triggered", trigger.alert.id),
                Err(e) => error!("Failed to mark alert {} triggered: {}", trigger.alert.id, e),
            }
        }

        let deliveries = persisted
            .iter()
            .map(|trigger| self.notifier.notify(&trigger.notification));
        for (trigger, outcome) in persisted.iter().zip(join_all(deliveries).await) {
            match outcome {
                Ok(()) => info!(
                    "Price alert {} triggered for user {}",
                    trigger.alert.id, trigger.alert.user_id
                ),
                // The alert stays triggered; delivery is not retried from here.
                Err(e) => warn!("Notification for alert {} failed: {}", trigger.alert.id, e),
            }
        }

        Ok(persisted)
    }
}

/// What the reporter should hear about a submission that was not accepted.
/// The returned notification has no recipient yet.
pub fn feedback_for(
    station_id: &str,
    result: &Result<SubmissionOutcome>,
) -> Option<Notification> {
    let (title, body, metadata) = match result {
        Ok(SubmissionOutcome::Accepted { .. }) => return None,
        Ok(SubmissionOutcome::NeedsConfirmation { last_report }) => (
            "Already reported",
            format!(
                "You reported this station at {}. Send again to confirm a new report.",
                last_report.created_at.format("%H:%M UTC")
            ),
            json!({
                "kind": "duplicate_warning",
                "station_id": station_id,
                "last_report_id": last_report.id,
                "last_report_at": last_report.created_at,
            }),
        ),
        Err(e @ FuelError::RateLimited { count, reset_time }) => (
            "Too many reports",
            e.to_string(),
            json!({
                "kind": "rate_limited",
                "station_id": station_id,
                "count": count,
                "reset_time": reset_time,
            }),
        ),
        Err(e @ FuelError::Validation(errors)) => (
            "Report not accepted",
            e.to_string(),
            json!({
                "kind": "validation",
                "station_id": station_id,
                "errors": errors,
            }),
        ),
        Err(e @ FuelError::StationNotFound(_)) => (
            "Report not accepted",
            e.to_string(),
            json!({
                "kind": "station_not_found",
                "station_id": station_id,
            }),
        ),
        Err(_) => return None,
    };

    Some(Notification {
        user_id: String::new(),
        title: title.to_string(),
        body,
        metadata,
    })
}

fn one_error(message: String) -> FuelError {
    FuelError::Validation(vec![message])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::OutboxNotifier;
    use crate::models::{AlertRequest, AlertStatus, Identity, QueueStatus, StationStatus};
    use chrono::Utc;

    fn lagos_store() -> Arc<MemoryStore> {
        let stations = vec![
            Station::new("S", "MRS Ojuelegba", "Ojuelegba Rd")
                .with_position(6.5095, 3.3711)
                .with_price(FuelType::Petrol, 950.0),
            Station::new("T", "Ardova Ikeja", "Allen Ave").with_position(6.6018, 3.3515),
        ];
        Arc::new(MemoryStore::with_stations(stations))
    }

    fn pipeline(store: &Arc<MemoryStore>) -> ReportPipeline {
        ReportPipeline::new(
            store.clone(),
            Arc::new(OutboxNotifier(store.clone())),
            SubmissionPolicy::default(),
        )
    }

    fn user() -> Identity {
        Identity::User {
            user_id: "u1".to_string(),
            display_name: "Segun".to_string(),
        }
    }

    fn submission(station_id: &str) -> ReportSubmission {
        ReportSubmission {
            station_id: station_id.to_string(),
            fuel_type: "petrol".to_string(),
            availability: "available".to_string(),
            queue_length: Some(20),
            price: Some(900.0),
            photo_url: None,
            reporter: user(),
            confirm_duplicate: false,
            reply_to: None,
        }
    }

    async fn add_alert(store: &MemoryStore, station_id: Option<&str>, target: f64) {
        let request = AlertRequest {
            user_id: "watcher".to_string(),
            station_id: station_id.map(str::to_string),
            fuel_type: FuelType::Petrol,
            target_price: target,
        };
        let alert = alerts::create_alert(&request, None, Utc::now()).unwrap();
        store.create_alert(&alert).await.unwrap();
    }

    #[tokio::test]
    async fn test_accepted_report_updates_station() {
        let store = lagos_store();
        let outcome = pipeline(&store).submit(submission("S")).await.unwrap();

        let SubmissionOutcome::Accepted { report, triggered } = outcome else {
            panic!("expected acceptance");
        };
        assert!(triggered.is_empty());
        assert_eq!(report.quality_score, 0.7);

        let station = store.station("S").unwrap();
        assert_eq!(station.price_of(FuelType::Petrol), Some(900.0));
        assert_eq!(station.queue_status, Some(QueueStatus::Medium));
        assert_eq!(station.last_reporter.as_deref(), Some("Segun"));
        assert_eq!(station.last_updated, Some(report.created_at));
    }

    #[tokio::test]
    async fn test_empty_report_deactivates_and_clears_queue() {
        let store = lagos_store();
        let sub = ReportSubmission {
            availability: "empty".to_string(),
            price: None,
            ..submission("S")
        };
        pipeline(&store).submit(sub).await.unwrap();

        let station = store.station("S").unwrap();
        assert_eq!(station.status, StationStatus::Inactive);
        assert_eq!(station.queue_status, None);
    }

    #[tokio::test]
    async fn test_validation_errors_write_nothing() {
        let store = lagos_store();
        let sub = ReportSubmission {
            fuel_type: "water".to_string(),
            ..submission("S")
        };
        let err = pipeline(&store).submit(sub).await.unwrap_err();
        assert!(matches!(err, FuelError::Validation(ref e) if e.len() == 1));
        assert!(store.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fine_price_range_is_enforced() {
        let store = lagos_store();
        let sub = ReportSubmission {
            price: Some(300.0),
            ..submission("S")
        };
        let err = pipeline(&store).submit(sub).await.unwrap_err();
        assert!(matches!(err, FuelError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_station() {
        let store = lagos_store();
        let err = pipeline(&store).submit(submission("nope")).await.unwrap_err();
        assert!(matches!(err, FuelError::StationNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_duplicate_needs_confirmation() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        pipeline.submit(submission("S")).await.unwrap();

        let second = pipeline.submit(submission("S")).await.unwrap();
        assert!(matches!(second, SubmissionOutcome::NeedsConfirmation { .. }));
        assert_eq!(store.reports.lock().unwrap().len(), 1);

        let confirmed = ReportSubmission {
            confirm_duplicate: true,
            ..submission("S")
        };
        let third = pipeline.submit(confirmed).await.unwrap();
        assert!(matches!(third, SubmissionOutcome::Accepted { .. }));
        assert_eq!(store.reports.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_sixth_report() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        for _ in 0..5 {
            let sub = ReportSubmission {
                confirm_duplicate: true,
                ..submission("T")
            };
            pipeline.submit(sub).await.unwrap();
        }

        let sub = ReportSubmission {
            confirm_duplicate: true,
            ..submission("S")
        };
        let err = pipeline.submit(sub).await.unwrap_err();
        match err {
            FuelError::RateLimited { count, .. } => assert_eq!(count, 5),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(store.reports.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_guests_are_not_limited() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        for _ in 0..7 {
            let sub = ReportSubmission {
                reporter: Identity::Guest {
                    display_name: "Ada".to_string(),
                },
                ..submission("T")
            };
            let outcome = pipeline.submit(sub).await.unwrap();
            assert!(matches!(outcome, SubmissionOutcome::Accepted { .. }));
        }
    }

    #[tokio::test]
    async fn test_price_drop_triggers_alert_once() {
        let store = lagos_store();
        add_alert(&store, Some("S"), 920.0).await;
        add_alert(&store, None, 800.0).await;
        let pipeline = pipeline(&store);

        let SubmissionOutcome::Accepted { triggered, .. } =
            pipeline.submit(submission("S")).await.unwrap()
        else {
            panic!("expected acceptance");
        };
        assert_eq!(triggered.len(), 1);
        assert_eq!(store.outbox.lock().unwrap().len(), 1);
        let statuses: Vec<AlertStatus> =
            store.alerts.lock().unwrap().iter().map(|a| a.status).collect();
        assert_eq!(statuses, vec![AlertStatus::Triggered, AlertStatus::Active]);

        let again = ReportSubmission {
            confirm_duplicate: true,
            ..submission("S")
        };
        let SubmissionOutcome::Accepted { triggered, .. } = pipeline.submit(again).await.unwrap()
        else {
            panic!("expected acceptance");
        };
        assert!(triggered.is_empty());
        assert_eq!(store.outbox.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_alert_triggered() {
        let store = Arc::new(MemoryStore {
            fail_notifications: true,
            ..MemoryStore::with_stations(vec![Station::new("S", "MRS", "Ojuelegba")])
        });
        add_alert(&store, Some("S"), 920.0).await;

        let outcome = pipeline(&store).submit(submission("S")).await.unwrap();
        assert!(matches!(outcome, SubmissionOutcome::Accepted { ref triggered, .. } if triggered.len() == 1));
        assert_eq!(store.alerts.lock().unwrap()[0].status, AlertStatus::Triggered);
    }

    #[tokio::test]
    async fn test_failed_station_update_stores_no_report() {
        let store = Arc::new(MemoryStore {
            fail_station_updates: true,
            ..MemoryStore::with_stations(vec![Station::new("S", "MRS", "Ojuelegba")
                .with_price(FuelType::Petrol, 950.0)])
        });
        add_alert(&store, Some("S"), 920.0).await;

        let err = pipeline(&store).submit(submission("S")).await.unwrap_err();
        assert!(matches!(err, FuelError::Store { .. }));
        assert!(store.reports.lock().unwrap().is_empty());
        assert_eq!(store.station("S").unwrap().price_of(FuelType::Petrol), Some(950.0));
        assert_eq!(store.alerts.lock().unwrap()[0].status, AlertStatus::Active);
        assert!(store.outbox.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alert_triggered_elsewhere_is_not_announced_again() {
        let store = Arc::new(MemoryStore {
            stale_alert_reads: true,
            ..MemoryStore::with_stations(vec![Station::new("S", "MRS", "Ojuelegba")])
        });
        add_alert(&store, Some("S"), 920.0).await;
        assert!(store.alerts.lock().unwrap()[0].trigger(Utc::now()));

        let SubmissionOutcome::Accepted { triggered, .. } =
            pipeline(&store).submit(submission("S")).await.unwrap()
        else {
            panic!("expected acceptance");
        };
        assert!(triggered.is_empty());
        assert!(store.outbox.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_warning_is_sent_to_reporter() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        pipeline.submit_and_reply(submission("S")).await.unwrap();
        assert!(store.outbox.lock().unwrap().is_empty());

        let second = pipeline.submit_and_reply(submission("S")).await.unwrap();
        assert!(matches!(second, SubmissionOutcome::NeedsConfirmation { .. }));

        let outbox = store.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].user_id, "u1");
        assert_eq!(outbox[0].metadata["kind"], "duplicate_warning");
        assert_eq!(outbox[0].metadata["station_id"], "S");
    }

    #[tokio::test]
    async fn test_rate_limit_reply_carries_reset_time() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        for _ in 0..5 {
            let sub = ReportSubmission {
                confirm_duplicate: true,
                ..submission("T")
            };
            pipeline.submit_and_reply(sub).await.unwrap();
        }

        let err = pipeline.submit_and_reply(submission("S")).await.unwrap_err();
        let reset_time = match err {
            FuelError::RateLimited { reset_time, .. } => reset_time,
            other => panic!("expected rate limit, got {:?}", other),
        };

        let outbox = store.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].metadata["kind"], "rate_limited");
        assert_eq!(outbox[0].metadata["count"], 5);
        assert_eq!(outbox[0].metadata["reset_time"], serde_json::to_value(reset_time).unwrap());
        assert!(outbox[0].body.contains("try again after"));
    }

    #[tokio::test]
    async fn test_guest_rejection_uses_reply_key() {
        let store = lagos_store();
        let pipeline = pipeline(&store);
        let guest = |reply_to: Option<&str>| ReportSubmission {
            fuel_type: "kerosene".to_string(),
            reporter: Identity::Guest {
                display_name: "Ada".to_string(),
            },
            reply_to: reply_to.map(str::to_string),
            ..submission("S")
        };

        pipeline.submit_and_reply(guest(None)).await.unwrap_err();
        assert!(store.outbox.lock().unwrap().is_empty());

        pipeline.submit_and_reply(guest(Some("device-42"))).await.unwrap_err();
        let outbox = store.outbox.lock().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].user_id, "device-42");
        assert_eq!(outbox[0].metadata["kind"], "validation");
    }

    #[tokio::test]
    async fn test_feedback_failure_keeps_outcome() {
        let store = Arc::new(MemoryStore {
            fail_notifications: true,
            ..MemoryStore::with_stations(vec![Station::new("S", "MRS", "Ojuelegba")])
        });
        let pipeline = pipeline(&store);
        pipeline.submit_and_reply(submission("S")).await.unwrap();

        let second = pipeline.submit_and_reply(submission("S")).await.unwrap();
        assert!(matches!(second, SubmissionOutcome::NeedsConfirmation { .. }));
    }
}
