use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("cron job not found: {0}")]
    JobNotFound(String),

    #[error("cron job is not running: {0}")]
    NotRunning(String),

    #[error("cron job already registered: {0}")]
    AlreadyRegistered(String),

    #[error("interval number must be greater than 0, got {0}")]
    InvalidIntervalNumber(i64),

    #[error("unknown interval base: {0} (expected second, minute, hour, day, week, month or year)")]
    UnknownIntervalBase(String),
}
