//! Guards applied to crowd-sourced writes before they reach the store.

pub mod duplicate;
pub mod quality;
pub mod rate_limit;
pub mod validator;

pub use duplicate::{is_duplicate, DuplicateCheck};
pub use quality::score;
pub use rate_limit::{check_limit, RateLimitCheck};
pub use validator::{validate, validate_price, ValidationReport};
