pub mod message;
pub mod price_alert;
pub mod report;
pub mod station;

pub use price_alert::{AlertRequest, AlertStatus, PriceAlert};
pub use report::{Availability, Identity, NewReport, ReportSubmission, StatusReport};
pub use station::{FuelType, QueueStatus, Station, StationStatus};
