//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::redis::RedisPool;

use super::{
    MAIL_SEND_DURATION_SECONDS, MAIL_SEND_TIMEOUTS_TOTAL, NOTIFICATIONS_DISPATCHED_TOTAL,
    NOTIFICATIONS_ENQUEUED_TOTAL, NOTIFICATIONS_FAILED_TOTAL, QUEUE_DEPTH,
    QUEUE_EMPTY_POLLS_TOTAL, QUEUE_ERRORS_TOTAL, REDIS_CIRCUIT_BREAKER_STATE,
    REDIS_CONNECTION_STATUS, SCHEDULER_RUNNING_JOBS, SCHEDULER_TICKS_TOTAL,
    SCHEDULER_TICK_DURATION_SECONDS,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording notification outcomes
pub struct NotificationMetrics;

impl NotificationMetrics {
    pub fn record_enqueued(name: &str) {
        NOTIFICATIONS_ENQUEUED_TOTAL.with_label_values(&[name]).inc();
    }

    pub fn record_dispatched(name: &str) {
        NOTIFICATIONS_DISPATCHED_TOTAL
            .with_label_values(&[name])
            .inc();
    }

    pub fn record_failed(name: &str, kind: &str) {
        NOTIFICATIONS_FAILED_TOTAL
            .with_label_values(&[name, kind])
            .inc();
    }
}

/// Helper struct for queue metrics
pub struct QueueMetrics;

impl QueueMetrics {
    pub fn set_depth(depth: usize) {
        QUEUE_DEPTH.set(depth as i64);
    }

    pub fn record_empty_poll() {
        QUEUE_EMPTY_POLLS_TOTAL.inc();
    }

    /// Record a backend error for `push`, `pop` or `len`
    pub fn record_error(operation: &str) {
        QUEUE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
    }
}

/// Helper struct for scheduler metrics
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    pub fn record_tick(job: &str, duration: Duration) {
        SCHEDULER_TICKS_TOTAL.with_label_values(&[job]).inc();
        SCHEDULER_TICK_DURATION_SECONDS
            .with_label_values(&[job])
            .observe(duration.as_secs_f64());
    }

    pub fn job_started() {
        SCHEDULER_RUNNING_JOBS.inc();
    }

    pub fn job_stopped() {
        SCHEDULER_RUNNING_JOBS.dec();
    }
}

/// Helper struct for mail delivery metrics
pub struct MailMetrics;

impl MailMetrics {
    pub fn record_send(duration: Duration) {
        MAIL_SEND_DURATION_SECONDS.observe(duration.as_secs_f64());
    }

    pub fn record_timeout() {
        MAIL_SEND_TIMEOUTS_TOTAL.inc();
    }
}

/// Helper struct for Redis health gauges
pub struct RedisMetrics;

impl RedisMetrics {
    /// Mirror pool state into the connection and breaker gauges
    pub fn update_redis(pool: &RedisPool) {
        REDIS_CONNECTION_STATUS.set(if pool.is_healthy() { 1 } else { 0 });
        REDIS_CIRCUIT_BREAKER_STATE.set(pool.circuit_state() as i64);
    }
}
