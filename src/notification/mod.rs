//! Notification types, the dispatch table and the producer side.
//!
//! Records popped from the queue are decoded once into [`Notification`],
//! then [`NotificationDispatcher`] routes each variant to its handler,
//! renders the handler's template and sends the mail.

mod dispatcher;
mod error;
pub mod handlers;
mod names;
mod payloads;
mod producer;

pub use dispatcher::{DispatchOutcome, DispatcherStatsSnapshot, NotificationDispatcher};
pub use error::{DispatchError, ErrorKind};
pub use names::{NotificationName, UnknownName};
pub use payloads::{
    ContactUs, EmailVerification, MagicLink, Notification, Otp, ResetPassword, Squeeze,
    WelcomeMail,
};
pub use producer::{EnqueueError, NotificationProducer};
