//! Redis infrastructure for the notification queue.
//!
//! - `CircuitBreaker`: stops hammering an unavailable store
//! - `pool`: multiplexed connection with list helpers and connection status

mod circuit_breaker;
pub mod pool;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use pool::{ConnectionStatus, PoolError, RedisPool, RedisPoolExt};

/// Current time in milliseconds since epoch
pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
