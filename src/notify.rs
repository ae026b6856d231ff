//! Outbound collaborators: user notifications and on-site presence.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub body: String,
    pub metadata: Value,
}

/// Delivers a notification. Rendering and transport are the sink's concern.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Who was seen at a station. Guests are recorded anonymously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceIntent {
    pub station_id: String,
    pub user_id: Option<String>,
}

/// Best-effort "user is at this station" channel.
#[async_trait]
pub trait PresenceSink: Send + Sync {
    async fn record_presence(&self, intent: &PresenceIntent) -> Result<()>;
}
