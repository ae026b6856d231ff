pub mod alert_requests;
pub mod message_processor;
pub mod submission;
