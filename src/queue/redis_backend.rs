//! Redis list backed notification queue.
//!
//! Records are serialized as JSON and pushed to the head of the list with
//! LPUSH; the tail is consumed with RPOP, giving FIFO order per key.

use std::sync::Arc;

use async_trait::async_trait;

use crate::redis::{RedisPool, RedisPoolExt};

use super::backend::{NotificationQueue, QueueError};
use super::NotificationRecord;

pub struct RedisQueue {
    pool: Arc<RedisPool>,
    key: String,
}

impl RedisQueue {
    pub fn new(pool: Arc<RedisPool>, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Decode one list entry; undecodable entries are already off the list.
fn decode_entry(raw: &str) -> Result<NotificationRecord, QueueError> {
    serde_json::from_str(raw).map_err(|e| QueueError::Malformed(format!("{e}: {raw}")))
}

#[async_trait]
impl NotificationQueue for RedisQueue {
    async fn push(&self, record: &NotificationRecord) -> Result<(), QueueError> {
        let payload = serde_json::to_string(record)?;
        self.pool.lpush(&self.key, &payload).await?;

        tracing::debug!(name = %record.name, key = %self.key, "Notification record pushed");
        Ok(())
    }

    async fn pop(&self) -> Result<Option<NotificationRecord>, QueueError> {
        let Some(raw) = self.pool.rpop(&self.key).await? else {
            return Ok(None);
        };

        decode_entry(&raw).map(Some)
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.pool.llen(&self.key).await?)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entry() {
        let record = decode_entry(r#"{"name":"send_otp","data":"{\"otp\":\"1234\"}"}"#).unwrap();
        assert_eq!(record.name, "send_otp");
        assert_eq!(record.data, r#"{"otp":"1234"}"#);
        assert!(!record.sent);
    }

    #[test]
    fn test_decode_entry_rejects_malformed() {
        for raw in ["not json", r#"{"data":"{}"}"#, r#"["send_otp"]"#] {
            match decode_entry(raw) {
                Err(QueueError::Malformed(msg)) => assert!(msg.ends_with(raw), "{msg}"),
                other => panic!("expected malformed entry for {raw}, got {other:?}"),
            }
        }
    }
}
