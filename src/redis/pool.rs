//! Redis connection pool backing the notification queue.
//!
//! Holds a single multiplexed connection shared across tasks and records
//! every command outcome on the circuit breaker.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError, RedisResult};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::RedisConfig;

use super::{current_time_ms, CircuitBreaker, CircuitState};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Circuit breaker is open")]
    CircuitOpen,
}

/// Queue store reachability as seen by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    /// No live connection; the next command reconnects
    Disconnected,
    CircuitOpen,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::CircuitOpen => "circuit_open",
        }
    }
}

pub struct RedisPool {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    circuit_breaker: Arc<CircuitBreaker>,
    /// Failed connects since the last successful one
    failed_connects: AtomicU32,
    /// Milliseconds since epoch of the last successful connect, 0 if never
    last_connected_ms: AtomicI64,
    config: RedisConfig,
}

impl RedisPool {
    pub fn new(config: RedisConfig, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, PoolError> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            circuit_breaker,
            failed_connects: AtomicU32::new(0),
            last_connected_ms: AtomicI64::new(0),
            config,
        })
    }

    /// Get the shared connection, connecting lazily.
    pub async fn get_connection(&self) -> Result<MultiplexedConnection, PoolError> {
        if !self.circuit_breaker.allow_request() {
            return Err(PoolError::CircuitOpen);
        }

        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        self.connect().await
    }

    async fn connect(&self) -> Result<MultiplexedConnection, PoolError> {
        let mut conn_guard = self.connection.write().await;

        // Another task may have connected while we waited for the lock
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                self.circuit_breaker.record_success();
                self.failed_connects.store(0, Ordering::Release);
                self.last_connected_ms.store(current_time_ms(), Ordering::Release);
                tracing::info!("Redis pool connection established");
                Ok(conn)
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                let failed = self.failed_connects.fetch_add(1, Ordering::AcqRel) + 1;
                tracing::error!(error = %e, failed_connects = failed, "Failed to connect to Redis");
                Err(PoolError::Redis(e))
            }
        }
    }

    /// Run a command on the shared connection, recording the outcome.
    pub async fn execute<F, T, Fut>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = RedisResult<T>>,
    {
        let conn = self.get_connection().await?;

        match f(conn).await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) => {
                if e.is_connection_dropped() || e.is_io_error() {
                    // Force a reconnect on the next call
                    self.connection.write().await.take();
                    tracing::warn!(error = %e, "Redis connection dropped");
                }
                self.circuit_breaker.record_failure();
                Err(PoolError::Redis(e))
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.circuit_breaker.state() == CircuitState::Open {
            return ConnectionStatus::CircuitOpen;
        }
        match self.connection.try_read() {
            Ok(conn) if conn.is_some() => ConnectionStatus::Connected,
            Ok(_) => ConnectionStatus::Disconnected,
            // A writer holds the lock: a connect or reset is in progress
            Err(_) => ConnectionStatus::Disconnected,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status() == ConnectionStatus::Connected
            && self.circuit_breaker.state() == CircuitState::Closed
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    pub fn failed_connects(&self) -> u32 {
        self.failed_connects.load(Ordering::Acquire)
    }

    /// `None` until the first successful connect
    pub fn last_connected_ms(&self) -> Option<i64> {
        let ms = self.last_connected_ms.load(Ordering::Acquire);
        (ms > 0).then_some(ms)
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub async fn ping(&self) -> Result<(), PoolError> {
        self.execute(|mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

/// List commands used by the notification queue.
#[async_trait::async_trait]
pub trait RedisPoolExt {
    /// Prepend a value to a list.
    async fn lpush(&self, key: &str, value: &str) -> Result<(), PoolError>;

    /// Remove and return the last element of a list.
    async fn rpop(&self, key: &str) -> Result<Option<String>, PoolError>;

    /// Length of a list (0 when the key does not exist).
    async fn llen(&self, key: &str) -> Result<usize, PoolError>;
}

#[async_trait::async_trait]
impl RedisPoolExt for RedisPool {
    async fn lpush(&self, key: &str, value: &str) -> Result<(), PoolError> {
        let key = key.to_string();
        let value = value.to_string();
        self.execute(|mut conn| async move { conn.lpush::<_, _, ()>(key, value).await })
            .await
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.rpop::<_, Option<String>>(key, None).await })
            .await
    }

    async fn llen(&self, key: &str) -> Result<usize, PoolError> {
        let key = key.to_string();
        self.execute(|mut conn| async move { conn.llen::<_, usize>(key).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_creation_does_not_connect() {
        let pool = RedisPool::new(RedisConfig::default(), Arc::new(CircuitBreaker::new())).unwrap();

        assert_eq!(pool.url(), "redis://localhost:6379");
        assert_eq!(pool.status(), ConnectionStatus::Disconnected);
        assert!(!pool.is_healthy());
        assert_eq!(pool.last_connected_ms(), None);
        assert_eq!(pool.failed_connects(), 0);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_commands() {
        let cb = Arc::new(CircuitBreaker::new());
        let pool = RedisPool::new(RedisConfig::default(), cb.clone()).unwrap();

        for _ in 0..5 {
            cb.record_failure();
        }

        let result = pool.llen("EmailQueue").await;
        assert!(matches!(result, Err(PoolError::CircuitOpen)));
        assert_eq!(pool.circuit_state(), CircuitState::Open);
        assert_eq!(pool.status(), ConnectionStatus::CircuitOpen);
        assert_eq!(pool.status().as_str(), "circuit_open");
        // Rejected before any connect attempt
        assert_eq!(pool.failed_connects(), 0);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        let result = RedisPool::new(config, Arc::new(CircuitBreaker::new()));
        assert!(matches!(result, Err(PoolError::Redis(_))));
    }
}
