//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::scheduler::JobStatus;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub queue: QueueHealthResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisHealthResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
    pub mailer: String,
    pub notifications: DispatcherStatsSnapshot,
    pub jobs: Vec<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct QueueHealthResponse {
    pub backend: String,
    /// `None` when the backend could not be reached
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RedisHealthResponse {
    pub status: String,
    pub connected: bool,
    pub circuit_breaker_state: String,
    pub failed_connects: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub status: String,
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

/// GET /health
///
/// Reports `degraded` when the queue cannot be read.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let depth = match state.queue.len().await {
        Ok(depth) => Some(depth),
        Err(e) => {
            tracing::warn!(error = %e, "Queue depth unavailable for health check");
            None
        }
    };

    let redis = state.redis_pool.as_ref().map(|pool| RedisHealthResponse {
        status: pool.status().as_str().to_string(),
        connected: pool.is_healthy(),
        circuit_breaker_state: pool.circuit_state().as_str().to_string(),
        failed_connects: pool.failed_connects(),
        last_connected_ms: pool.last_connected_ms(),
    });

    let postgres = state.postgres_pool.as_ref().map(|pool| {
        let inner_pool = pool.pool();
        let connected = pool.is_available();
        PostgresHealthResponse {
            status: if connected { "connected" } else { "unavailable" }.to_string(),
            connected,
            pool_size: inner_pool.size(),
            idle_connections: inner_pool.num_idle() as u32,
        }
    });

    let status = if depth.is_some() { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        queue: QueueHealthResponse {
            backend: state.queue.backend_name().to_string(),
            depth,
        },
        redis,
        postgres,
        mailer: state.dispatcher.mailer_name().to_string(),
        notifications: state.dispatcher.stats(),
        jobs: state.scheduler.jobs().await,
    })
}
