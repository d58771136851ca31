//! Durable queue of pending notification records.
//!
//! Producers push [`NotificationRecord`]s; the `send-notifications` job pops
//! them one per tick. Two backends are available:
//!
//! - `redis`: a Redis list (LPUSH / RPOP), survives restarts
//! - `memory`: a process-local deque for development and tests

mod backend;
mod factory;
mod memory_backend;
mod models;
mod redis_backend;

pub use backend::{NotificationQueue, QueueError};
pub use factory::create_queue;
pub use memory_backend::MemoryQueue;
pub use models::NotificationRecord;
pub use redis_backend::RedisQueue;
