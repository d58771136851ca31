//! Queue backend factory

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::redis::RedisPool;

use super::backend::NotificationQueue;
use super::memory_backend::MemoryQueue;
use super::redis_backend::RedisQueue;

/// Create a queue backend based on `queue.backend`.
///
/// - `"redis"`: a `RedisQueue` on `queue.key`, if a pool is provided
/// - `"memory"`: a `MemoryQueue`
///
/// Unknown backends and a missing Redis pool fall back to memory.
pub fn create_queue(
    settings: &QueueConfig,
    redis_pool: Option<Arc<RedisPool>>,
) -> Arc<dyn NotificationQueue> {
    match settings.backend.as_str() {
        "redis" => {
            if let Some(pool) = redis_pool {
                tracing::info!(backend = "redis", key = %settings.key, "Creating Redis queue");
                Arc::new(RedisQueue::new(pool, settings.key.clone()))
            } else {
                tracing::warn!("Redis queue requested but no pool provided, falling back to memory");
                Arc::new(MemoryQueue::new())
            }
        }
        "memory" => {
            tracing::info!(backend = "memory", "Creating in-memory queue");
            Arc::new(MemoryQueue::new())
        }
        other => {
            tracing::warn!(backend = %other, "Unknown queue backend, falling back to memory");
            Arc::new(MemoryQueue::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_without_pool_falls_back_to_memory() {
        let queue = create_queue(&QueueConfig::default(), None);
        assert_eq!(queue.backend_name(), "memory");
    }

    #[test]
    fn test_redis_with_pool() {
        let pool = RedisPool::new(
            crate::config::RedisConfig::default(),
            Arc::new(crate::redis::CircuitBreaker::new()),
        )
        .unwrap();
        let queue = create_queue(&QueueConfig::default(), Some(Arc::new(pool)));
        assert_eq!(queue.backend_name(), "redis");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_memory() {
        let settings = QueueConfig {
            backend: "kafka".to_string(),
            ..Default::default()
        };
        assert_eq!(create_queue(&settings, None).backend_name(), "memory");
    }
}
