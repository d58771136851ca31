//! API layer - HTTP endpoint handlers organized by domain.

mod cronjobs;
mod health;
mod metrics;
mod notifications;
mod routes;

pub use cronjobs::{list_jobs, restart_job, start_job, stop_job, update_interval};
pub use health::{health, HealthResponse};
pub use metrics::prometheus_metrics;
pub use notifications::enqueue_notification;
pub use routes::api_routes;
