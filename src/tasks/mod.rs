//! Background jobs run by the scheduler.

mod send_notifications;

pub use send_notifications::{SendNotificationsJob, TickOutcome, SEND_NOTIFICATIONS};
