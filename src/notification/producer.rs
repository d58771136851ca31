use std::sync::Arc;

use thiserror::Error;

use crate::metrics::{NotificationMetrics, QueueMetrics};
use crate::queue::{NotificationQueue, NotificationRecord, QueueError};

use super::error::DispatchError;
use super::payloads::Notification;

#[derive(Debug, Error)]
pub enum EnqueueError {
    /// Name or payload rejected before reaching the queue
    #[error(transparent)]
    Invalid(#[from] DispatchError),

    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Validates notifications and pushes them onto the queue.
///
/// Success means the record is queued, not that it was delivered.
#[derive(Clone)]
pub struct NotificationProducer {
    queue: Arc<dyn NotificationQueue>,
}

impl NotificationProducer {
    pub fn new(queue: Arc<dyn NotificationQueue>) -> Self {
        Self { queue }
    }

    pub async fn enqueue(
        &self,
        notification: impl Into<Notification>,
    ) -> Result<NotificationRecord, EnqueueError> {
        let record = notification.into().to_record()?;
        self.push(record).await
    }

    /// Enqueue an untyped name/payload pair after checking that it decodes.
    pub async fn enqueue_raw(
        &self,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<NotificationRecord, EnqueueError> {
        let record = NotificationRecord::new(name, data.to_string());
        Notification::decode(&record)?;
        self.push(record).await
    }

    async fn push(&self, record: NotificationRecord) -> Result<NotificationRecord, EnqueueError> {
        if let Err(e) = self.queue.push(&record).await {
            QueueMetrics::record_error("push");
            return Err(e.into());
        }

        NotificationMetrics::record_enqueued(&record.name);
        tracing::info!(name = %record.name, "Notification enqueued");
        Ok(record)
    }
}
