use chrono::{DateTime, Duration, Utc};

use crate::models::{Identity, StatusReport};

pub const DEFAULT_DUPLICATE_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub last_report: Option<StatusReport>,
}

impl DuplicateCheck {
    fn clear() -> Self {
        Self {
            is_duplicate: false,
            last_report: None,
        }
    }
}

/// Looks for a report by the same user on the same station inside the window.
///
/// `now` and the report timestamps must both come from the store. Guests have
/// no stable identity and are never flagged. The result is advisory: the
/// caller asks the user to confirm rather than rejecting.
pub fn is_duplicate(
    identity: &Identity,
    station_id: &str,
    reports: &[StatusReport],
    now: DateTime<Utc>,
    window_minutes: i64,
) -> DuplicateCheck {
    let Some(user_id) = identity.user_id() else {
        return DuplicateCheck::clear();
    };
    let since = now - Duration::minutes(window_minutes);

    let last = reports
        .iter()
        .filter(|r| r.user_id.as_deref() == Some(user_id))
        .filter(|r| r.station_id == station_id)
        .filter(|r| r.created_at >= since)
        .max_by_key(|r| r.created_at);

    match last {
        Some(report) => DuplicateCheck {
            is_duplicate: true,
            last_report: Some(report.clone()),
        },
        None => DuplicateCheck::clear(),
    }
}
