use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::cronjobs::{list_jobs, restart_job, start_job, stop_job, update_interval};
use super::health::health;
use super::metrics::prometheus_metrics;
use super::notifications::enqueue_notification;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Operator endpoints
        .nest(
            "/api/v1",
            Router::new()
                // Cron jobs
                .route("/cronjobs", get(list_jobs))
                .route("/cronjobs/start", post(start_job))
                .route("/cronjobs/stop", post(stop_job))
                .route("/cronjobs/restart", post(restart_job))
                .route("/cronjobs/interval", patch(update_interval))
                // Notifications
                .route("/notifications", post(enqueue_notification))
                .layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
