//! Backend trait for notification queue storage.

use async_trait::async_trait;
use thiserror::Error;

use crate::redis::PoolError;

use super::NotificationRecord;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Backend is temporarily unavailable (e.g., circuit breaker open)
    #[error("Queue backend unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A popped entry was not a notification record. It is already removed.
    #[error("Malformed queue entry: {0}")]
    Malformed(String),
}

impl From<PoolError> for QueueError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Redis(e) => QueueError::Redis(e),
            PoolError::CircuitOpen => {
                QueueError::Unavailable("Circuit breaker is open".to_string())
            }
        }
    }
}

/// FIFO store of pending notification records.
///
/// Implementations must be thread-safe; one instance is shared by every
/// producer and the draining job.
#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Append a record.
    async fn push(&self, record: &NotificationRecord) -> Result<(), QueueError>;

    /// Remove and return the oldest record. `Ok(None)` means the queue is empty.
    async fn pop(&self) -> Result<Option<NotificationRecord>, QueueError>;

    /// Number of pending records.
    async fn len(&self) -> Result<usize, QueueError>;

    /// Backend identifier for health output.
    fn backend_name(&self) -> &'static str;
}
