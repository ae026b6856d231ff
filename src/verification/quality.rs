use crate::models::ReportSubmission;

const PHOTO_WEIGHT: f64 = 0.30;
const PRICE_WEIGHT: f64 = 0.20;
const QUEUE_WEIGHT: f64 = 0.20;
const AUTHENTICATED_WEIGHT: f64 = 0.20;
const NAMED_WEIGHT: f64 = 0.10;

/// Names clients fill in when the user gave none.
const PLACEHOLDER_NAMES: [&str; 4] = ["anonymous", "guest", "user", "unknown"];

/// Confidence in a report, 0.0 to 1.0. A trust signal for display ranking; it
/// never blocks a submission.
pub fn score(report: &ReportSubmission) -> f64 {
    let has_photo = report
        .photo_url
        .as_deref()
        .is_some_and(|url| !url.trim().is_empty());
    let has_price = report.price.is_some();
    let has_queue = report.queue_length.is_some();
    let authenticated = report.reporter.is_authenticated();
    let named = has_real_name(report.reporter_name());

    let mut total = 0.0;
    if has_photo {
        total += PHOTO_WEIGHT;
    }
    if has_price {
        total += PRICE_WEIGHT;
    }
    if has_queue {
        total += QUEUE_WEIGHT;
    }
    if authenticated {
        total += AUTHENTICATED_WEIGHT;
    }
    if named {
        total += NAMED_WEIGHT;
    }

    // Decimal weights do not sum exactly in f64; snap to two places.
    ((total * 100.0).round() / 100.0).min(1.0)
}

fn has_real_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && !PLACEHOLDER_NAMES
            .iter()
            .any(|placeholder| name.eq_ignore_ascii_case(placeholder))
}
