use serde::Serialize;

use crate::models::{Availability, FuelType, ReportSubmission};

pub const MAX_QUEUE_MINUTES: i64 = 300;
/// Coarse sanity bound in Naira, applied regardless of fuel type.
pub const MIN_PRICE: f64 = 100.0;
pub const MAX_PRICE: f64 = 5000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks shape and ranges of a submission. Every rule is evaluated so the
/// caller gets all violations at once.
pub fn validate(report: &ReportSubmission) -> ValidationReport {
    let mut errors = Vec::new();

    if report.fuel_type.parse::<FuelType>().is_err() {
        errors.push(format!(
            "Invalid fuel type '{}': expected one of petrol, diesel, premium, gas",
            report.fuel_type
        ));
    }

    if report.availability.parse::<Availability>().is_err() {
        errors.push(format!(
            "Invalid availability '{}': expected one of available, low, empty",
            report.availability
        ));
    }

    if let Some(minutes) = report.queue_length {
        if !(0..=MAX_QUEUE_MINUTES).contains(&minutes) {
            errors.push(format!(
                "Queue length must be between 0 and {} minutes, got {}",
                MAX_QUEUE_MINUTES, minutes
            ));
        }
    }

    if let Some(price) = report.price {
        if !price.is_finite() || !(MIN_PRICE..=MAX_PRICE).contains(&price) {
            errors.push(format!(
                "Price must be between ₦{} and ₦{}, got {}",
                MIN_PRICE, MAX_PRICE, price
            ));
        }
    }

    if report.reporter_name().trim().is_empty() {
        errors.push("Reporter name is required".to_string());
    }

    ValidationReport::from_errors(errors)
}

/// Fuel-specific plausibility check used when a price is being recorded.
/// Fuels without a configured range only get the coarse bound.
pub fn validate_price(fuel: FuelType, price: f64) -> Result<(), String> {
    if !price.is_finite() || price <= 0.0 {
        return Err(format!("Price for {} must be a positive number", fuel));
    }
    match fuel.price_range() {
        Some((min, max)) if !(min..=max).contains(&price) => Err(format!(
            "{} price must be between ₦{} and ₦{}, got {}",
            fuel, min, max, price
        )),
        _ => Ok(()),
    }
}
