//! User notifications

use async_trait::async_trait;
use tracing::info;
use crate::types::UserId;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: UserId, text: &str) -> anyhow::Result<()>;
}

/// Writes notifications to the log.
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, user_id: UserId, text: &str) -> anyhow::Result<()> {
        info!(user_id, "🔔 {}", text);
        Ok(())
    }
}

/// Delivers and forgets. Delivery problems never reach the caller.
pub async fn notify_quietly(sink: &dyn NotificationSink, user_id: UserId, text: &str) {
    if let Err(e) = sink.notify(user_id, text).await {
        tracing::debug!(user_id, error = %e, "Notification dropped");
    }
}
