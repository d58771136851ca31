//! Named, interval-driven background jobs.
//!
//! [`SchedulerRegistry`] owns every registered job and its run loop. Each
//! running job has one tokio task that ticks, then sleeps for the job's
//! current interval, and exits when its stop signal fires.

mod error;
mod interval;
mod job;
mod registry;

pub use error::SchedulerError;
pub use interval::{interval_from, IntervalBase};
pub use job::CronJob;
pub use registry::{JobStatus, SchedulerRegistry};
