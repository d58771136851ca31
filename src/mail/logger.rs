use async_trait::async_trait;

use super::{MailError, MailTransport, OutgoingMail};

/// Logs each mail instead of delivering it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        mail.validate()?;
        tracing::info!(
            mail_id = %mail.id,
            from = %self.from,
            to = ?mail.to,
            subject = %mail.subject,
            body_len = mail.body.len(),
            "Mail logged (not sent)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
