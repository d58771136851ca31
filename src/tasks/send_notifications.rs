use std::sync::Arc;

use async_trait::async_trait;

use crate::metrics::QueueMetrics;
use crate::notification::{DispatchOutcome, NotificationDispatcher};
use crate::queue::{NotificationQueue, NotificationRecord};
use crate::scheduler::CronJob;

/// Registry name of the queue drain job
pub const SEND_NOTIFICATIONS: &str = "send-notifications";

/// What a single drain tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was queued
    Idle,
    /// The queue could not be read
    QueueError,
    /// A record was popped but could not be delivered; it is gone
    Failed { name: String },
    /// The record was delivered and is marked sent
    Dispatched {
        record: NotificationRecord,
        outcome: DispatchOutcome,
    },
}

/// Pops one notification record per tick and dispatches it.
pub struct SendNotificationsJob {
    queue: Arc<dyn NotificationQueue>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl SendNotificationsJob {
    pub fn new(queue: Arc<dyn NotificationQueue>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { queue, dispatcher }
    }

    pub async fn tick(&self) -> TickOutcome {
        let mut record = match self.queue.pop().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                QueueMetrics::record_empty_poll();
                tracing::debug!(job = SEND_NOTIFICATIONS, "Notification queue is empty");
                return TickOutcome::Idle;
            }
            Err(e) => {
                QueueMetrics::record_error("pop");
                tracing::error!(
                    job = SEND_NOTIFICATIONS,
                    backend = self.queue.backend_name(),
                    error = %e,
                    "Failed to pop notification record"
                );
                return TickOutcome::QueueError;
            }
        };

        let outcome = match self.dispatcher.dispatch(&record).await {
            Ok(outcome) => {
                record.sent = true;
                tracing::info!(
                    job = SEND_NOTIFICATIONS,
                    name = %record.name,
                    recipient = %outcome.recipient,
                    mail_id = %outcome.mail_id,
                    "Notification sent"
                );
                TickOutcome::Dispatched { record, outcome }
            }
            Err(e) => {
                tracing::error!(
                    job = SEND_NOTIFICATIONS,
                    name = %record.name,
                    kind = %e.kind(),
                    error = %e,
                    "Failed to dispatch notification"
                );
                TickOutcome::Failed { name: record.name }
            }
        };

        if let Ok(depth) = self.queue.len().await {
            QueueMetrics::set_depth(depth);
        }

        outcome
    }
}

#[async_trait]
impl CronJob for SendNotificationsJob {
    async fn run(&self) {
        self.tick().await;
    }
}
