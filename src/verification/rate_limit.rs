use chrono::{DateTime, Duration, Utc};

use crate::models::{Identity, StatusReport};

pub const DEFAULT_MAX_REPORTS: usize = 5;
pub const DEFAULT_RATE_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitCheck {
    pub exceeded: bool,
    pub count: usize,
    /// When the oldest report in the window ages out.
    pub reset_time: Option<DateTime<Utc>>,
}

/// Counts the user's reports across all stations inside the trailing window.
///
/// Exceeding the quota is a hard block. Guests are not tracked here and always
/// pass (see DESIGN.md).
pub fn check_limit(
    identity: &Identity,
    reports: &[StatusReport],
    now: DateTime<Utc>,
    max_reports: usize,
    window_minutes: i64,
) -> RateLimitCheck {
    let Some(user_id) = identity.user_id() else {
        return RateLimitCheck {
            exceeded: false,
            count: 0,
            reset_time: None,
        };
    };
    let window = Duration::minutes(window_minutes);
    let since = now - window;

    let in_window: Vec<&StatusReport> = reports
        .iter()
        .filter(|r| r.user_id.as_deref() == Some(user_id))
        .filter(|r| r.created_at >= since)
        .collect();

    let count = in_window.len();
    let reset_time = in_window.iter().map(|r| r.created_at).min().map(|t| t + window);

    RateLimitCheck {
        exceeded: count >= max_reports,
        count,
        reset_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::test_support::report_at;

    fn user() -> Identity {
        Identity::User {
            user_id: "u1".to_string(),
            display_name: "Bola".to_string(),
        }
    }

    fn history(n: i64, now: DateTime<Utc>) -> Vec<StatusReport> {
        (0..n)
            .map(|i| report_at("u1", &format!("s{}", i), now - Duration::minutes(5 * (i + 1))))
            .collect()
    }

    #[test]
    fn test_exactly_max_reports_is_exceeded() {
        let now = Utc::now();
        let check = check_limit(&user(), &history(5, now), now, 5, 60);
        assert!(check.exceeded);
        assert_eq!(check.count, 5);
        // Oldest is 25 minutes old, so the window frees up in 35 minutes
        assert_eq!(check.reset_time, Some(now + Duration::minutes(35)));
    }

    #[test]
    fn test_one_below_max_is_allowed() {
        let now = Utc::now();
        let check = check_limit(&user(), &history(4, now), now, 5, 60);
        assert!(!check.exceeded);
        assert_eq!(check.count, 4);
    }

    #[test]
    fn test_reports_outside_window_do_not_count() {
        let now = Utc::now();
        let mut reports = history(4, now);
        reports.push(report_at("u1", "s9", now - Duration::minutes(61)));
        reports.push(report_at("u2", "s9", now));

        let check = check_limit(&user(), &reports, now, 5, 60);
        assert!(!check.exceeded);
        assert_eq!(check.count, 4);
    }

    #[test]
    fn test_report_exactly_window_old_still_counts() {
        let now = Utc::now();
        let mut reports = history(4, now);
        reports.push(report_at("u1", "s9", now - Duration::minutes(60)));

        let check = check_limit(&user(), &reports, now, 5, 60);
        assert!(check.exceeded);
        assert_eq!(check.count, 5);
        assert_eq!(check.reset_time, Some(now));

        reports[4].created_at = now - Duration::minutes(60) - Duration::milliseconds(1);
        let check = check_limit(&user(), &reports, now, 5, 60);
        assert!(!check.exceeded);
        assert_eq!(check.count, 4);
    }

    #[test]
    fn test_empty_history_has_no_reset_time() {
        let now = Utc::now();
        let check = check_limit(&user(), &[], now, 5, 60);
        assert_eq!(check.count, 0);
        assert_eq!(check.reset_time, None);
    }

    #[test]
    fn test_guest_is_exempt() {
        let now = Utc::now();
        let guest = Identity::Guest {
            display_name: "Bola".to_string(),
        };
        let check = check_limit(&guest, &history(10, now), now, 5, 60);
        assert!(!check.exceeded);
    }
}
