use std::fmt;

use thiserror::Error;

use crate::mail::MailError;
use crate::template::TemplateError;
use crate::users::DirectoryError;

/// Coarse classification of a dispatch failure, used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    UnknownNotificationType,
    NotFound,
    Template,
    Delivery,
    Directory,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Decode => "decode",
            ErrorKind::UnknownNotificationType => "unknown_notification_type",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Template => "template",
            ErrorKind::Delivery => "delivery",
            ErrorKind::Directory => "directory",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed payload for {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("unknown notification type: {0}")]
    UnknownNotificationType(String),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] MailError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Decode { .. } => ErrorKind::Decode,
            DispatchError::UnknownNotificationType(_) => ErrorKind::UnknownNotificationType,
            DispatchError::NotFound(_) => ErrorKind::NotFound,
            DispatchError::Template(_) => ErrorKind::Template,
            DispatchError::Delivery(_) => ErrorKind::Delivery,
            DispatchError::Directory(_) => ErrorKind::Directory,
        }
    }
}
