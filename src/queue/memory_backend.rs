//! In-memory notification queue. Records are lost on restart.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::backend::{NotificationQueue, QueueError};
use super::NotificationRecord;

#[derive(Default)]
pub struct MemoryQueue {
    records: Mutex<VecDeque<NotificationRecord>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn push(&self, record: &NotificationRecord) -> Result<(), QueueError> {
        let mut records = self.records.lock().await;
        records.push_back(record.clone());
        tracing::debug!(
            name = %record.name,
            queue_size = records.len(),
            "Notification record enqueued"
        );
        Ok(())
    }

    async fn pop(&self) -> Result<Option<NotificationRecord>, QueueError> {
        Ok(self.records.lock().await.pop_front())
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.records.lock().await.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pop_empty_returns_none() {
        let queue = MemoryQueue::new();
        assert!(queue.pop().await.unwrap().is_none());
        assert_eq!(queue.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryQueue::new();
        for i in 0..3 {
            queue
                .push(&NotificationRecord::new("send_welcome_mail", format!("{i}")))
                .await
                .unwrap();
        }

        assert_eq!(queue.len().await.unwrap(), 3);
        for i in 0..3 {
            let record = queue.pop().await.unwrap().unwrap();
            assert_eq!(record.data, format!("{i}"));
        }
        assert!(queue.pop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_popped_record_is_not_returned_again() {
        let queue = MemoryQueue::new();
        let record = NotificationRecord::new("send_otp", "{}");
        queue.push(&record).await.unwrap();

        assert_eq!(queue.pop().await.unwrap(), Some(record));
        assert_eq!(queue.pop().await.unwrap(), None);
    }
}
