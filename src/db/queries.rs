pub const SELECT_NOW: &str = r#"
SELECT NOW() AS now;
"#;

pub const SELECT_STATIONS: &str = r#"
SELECT station_id, name, address, lat, lng, status, queue_status, prices,
       last_updated, last_reporter, confirmed_by, flagged_by, photo_url
FROM stations
ORDER BY station_id;
"#;

pub const SELECT_STATION: &str = r#"
SELECT station_id, name, address, lat, lng, status, queue_status, prices,
       last_updated, last_reporter, confirmed_by, flagged_by, photo_url
FROM stations
WHERE station_id = $1;
"#;

pub const INSERT_STATION: &str = r#"
INSERT INTO stations (station_id, name, address, lat, lng, status, queue_status, prices,
                      last_updated, last_reporter, confirmed_by, flagged_by, photo_url)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13);
"#;

/// `prices` is merged, so other fuel types keep their last known price.
pub const UPDATE_STATION_STATUS: &str = r#"
UPDATE stations
SET status = $2,
    queue_status = $3,
    prices = prices || $4,
    last_updated = $5,
    last_reporter = $6,
    photo_url = COALESCE($7, photo_url)
WHERE station_id = $1;
"#;

pub const UPDATE_STATION_VERIFICATION: &str = r#"
UPDATE stations
SET confirmed_by = $2,
    flagged_by = $3
WHERE station_id = $1;
"#;

pub const DELETE_STATION: &str = r#"
DELETE FROM stations WHERE station_id = $1;
"#;

pub const INSERT_REPORT: &str = r#"
INSERT INTO station_reports (
    report_id, station_id, fuel_type, availability, queue_length, price,
    photo_url, user_id, reporter_name, quality_score, created_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
RETURNING created_at;
"#;

pub const SELECT_USER_REPORTS_SINCE: &str = r#"
SELECT report_id, station_id, fuel_type, availability, queue_length, price,
       photo_url, user_id, reporter_name, quality_score, created_at
FROM station_reports
WHERE user_id = $1 AND created_at >= $2
ORDER BY created_at DESC;
"#;

pub const SELECT_ACTIVE_ALERTS: &str = r#"
SELECT alert_id, user_id, station_id, fuel_type, target_price, status, created_at, triggered_at
FROM price_alerts
WHERE status = 'active'
  AND fuel_type = $2
  AND (station_id = $1 OR station_id IS NULL)
ORDER BY created_at;
"#;

pub const INSERT_ALERT: &str = r#"
INSERT INTO price_alerts (alert_id, user_id, station_id, fuel_type, target_price, status, created_at)
VALUES ($1, $2, $3, $4, $5, $6, $7);
"#;

/// Guarded on status so the transition happens at most once.
pub const UPDATE_ALERT_TRIGGERED: &str = r#"
UPDATE price_alerts
SET status = 'triggered',
    triggered_at = $2
WHERE alert_id = $1 AND status = 'active';
"#;

pub const DELETE_ALERT: &str = r#"
DELETE FROM price_alerts WHERE alert_id = $1 AND user_id = $2;
"#;

pub const INSERT_PRESENCE: &str = r#"
INSERT INTO station_presence (station_id, user_id) VALUES ($1, $2);
"#;

pub const INSERT_NOTIFICATION: &str = r#"
INSERT INTO notification_outbox (notification_id, user_id, title, body, metadata)
VALUES ($1, $2, $3, $4, $5);
"#;
