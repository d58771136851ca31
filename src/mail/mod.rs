//! Outgoing mail and the transports that deliver it.
//!
//! - `SmtpMailer`: real delivery through `lettre`
//! - `LogMailer`: logs mails instead of sending them
//! - `RecordingMailer`: captures mails in memory

mod logger;
mod mock;
mod smtp;

pub use logger::LogMailer;
pub use mock::RecordingMailer;
pub use smtp::SmtpMailer;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail: {0}")]
    Invalid(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Send timed out after {0:?}")]
    Timeout(Duration),
}

/// A rendered mail ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub id: Uuid,
    pub to: Vec<String>,
    pub subject: String,
    /// HTML body
    pub body: String,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Reject mails a server would bounce or that would arrive blank.
    pub fn validate(&self) -> Result<(), MailError> {
        if self.subject.is_empty() {
            return Err(MailError::Invalid("subject is empty".to_string()));
        }
        if self.body.is_empty() {
            return Err(MailError::Invalid("body is empty".to_string()));
        }
        if self.to.is_empty() {
            return Err(MailError::Invalid("no recipients".to_string()));
        }
        for recipient in &self.to {
            if recipient.is_empty() {
                return Err(MailError::Invalid("empty recipient".to_string()));
            }
            if !recipient.contains('@') {
                return Err(MailError::Invalid(format!("invalid recipient: {recipient}")));
            }
        }
        Ok(())
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;

    fn name(&self) -> &'static str;
}

/// Build the transport selected by `mail.transport` (`smtp` or `log`).
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailError> {
    match config.transport.as_str() {
        "log" => {
            tracing::info!(transport = "log", "Mails will be logged, not sent");
            Ok(Arc::new(LogMailer::new(config.sender())))
        }
        "smtp" => {
            tracing::info!(
                transport = "smtp",
                host = %config.host,
                port = config.port,
                tls = config.use_tls,
                "Creating SMTP mailer"
            );
            Ok(Arc::new(SmtpMailer::new(config)?))
        }
        other => Err(MailError::Build(format!("unknown mail transport: {other}"))),
    }
}
