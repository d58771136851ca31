//! Prometheus metrics for the notification dispatch service.
//!
//! - Notification metrics (enqueued, dispatched, failed by type and kind)
//! - Queue metrics (depth, idle polls, backend errors)
//! - Scheduler metrics (ticks, tick duration, running jobs)
//! - Mail delivery latency
//! - Redis health

mod helpers;

pub use helpers::{
    encode_metrics, MailMetrics, NotificationMetrics, QueueMetrics, RedisMetrics, SchedulerMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notification_dispatch";

lazy_static! {
    // ============================================================================
    // Notification Metrics
    // ============================================================================

    /// Records pushed onto the queue, by notification name
    pub static ref NOTIFICATIONS_ENQUEUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_enqueued_total", METRIC_PREFIX),
        "Total notification records enqueued",
        &["name"]
    ).unwrap();

    /// Records dispatched successfully, by notification name
    pub static ref NOTIFICATIONS_DISPATCHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_dispatched_total", METRIC_PREFIX),
        "Total notifications dispatched successfully",
        &["name"]
    ).unwrap();

    /// Records that failed to dispatch, by notification name and error kind
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_failed_total", METRIC_PREFIX),
        "Total notifications that failed to dispatch",
        &["name", "kind"]
    ).unwrap();

    // ============================================================================
    // Queue Metrics
    // ============================================================================

    /// Last observed queue depth
    pub static ref QUEUE_DEPTH: IntGauge = register_int_gauge!(
        format!("{}_queue_depth", METRIC_PREFIX),
        "Number of notification records waiting in the queue"
    ).unwrap();

    /// Pops that found the queue empty
    pub static ref QUEUE_EMPTY_POLLS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_queue_empty_polls_total", METRIC_PREFIX),
        "Total queue pops that found no pending record"
    ).unwrap();

    /// Queue backend errors by operation
    pub static ref QUEUE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_queue_errors_total", METRIC_PREFIX),
        "Total queue backend errors",
        &["operation"]
    ).unwrap();

    // ============================================================================
    // Scheduler Metrics
    // ============================================================================

    /// Ticks executed per job
    pub static ref SCHEDULER_TICKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_scheduler_ticks_total", METRIC_PREFIX),
        "Total scheduler ticks executed",
        &["job"]
    ).unwrap();

    /// Tick duration per job
    pub static ref SCHEDULER_TICK_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        format!("{}_scheduler_tick_duration_seconds", METRIC_PREFIX),
        "Scheduler tick duration in seconds",
        &["job"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    /// Jobs with a live run loop
    pub static ref SCHEDULER_RUNNING_JOBS: IntGauge = register_int_gauge!(
        format!("{}_scheduler_running_jobs", METRIC_PREFIX),
        "Number of scheduler jobs currently running"
    ).unwrap();

    // ============================================================================
    // Mail Metrics
    // ============================================================================

    /// Mail send latency
    pub static ref MAIL_SEND_DURATION_SECONDS: Histogram = register_histogram!(
        format!("{}_mail_send_duration_seconds", METRIC_PREFIX),
        "Mail transport send duration in seconds",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    /// Sends that exceeded the per-send timeout
    pub static ref MAIL_SEND_TIMEOUTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_mail_send_timeouts_total", METRIC_PREFIX),
        "Total mail sends aborted by the send timeout"
    ).unwrap();

    // ============================================================================
    // Redis Metrics
    // ============================================================================

    /// Redis connection status (1 = connected, 0 = disconnected)
    pub static ref REDIS_CONNECTION_STATUS: IntGauge = register_int_gauge!(
        format!("{}_redis_connection_status", METRIC_PREFIX),
        "Redis connection status (1 = connected, 0 = disconnected)"
    ).unwrap();

    /// Circuit breaker state (0 = closed, 1 = open, 2 = half-open)
    pub static ref REDIS_CIRCUIT_BREAKER_STATE: IntGauge = register_int_gauge!(
        format!("{}_redis_circuit_breaker_state", METRIC_PREFIX),
        "Redis circuit breaker state (0 = closed, 1 = open, 2 = half-open)"
    ).unwrap();
}
