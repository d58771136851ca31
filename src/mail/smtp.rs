//! SMTP mail transport using lettre

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;

use super::{MailError, MailTransport, OutgoingMail};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Build(e.to_string()))?
        } else {
            // Plain connection for local catchers (Mailpit, Mailhog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let builder = builder
            .port(config.port)
            .timeout(Some(config.send_timeout()));

        let transport = if config.username.is_empty() {
            builder.build()
        } else {
            builder
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .build()
        };

        let from = format!("{} <{}>", config.from_name, config.sender())
            .parse()
            .map_err(|e| MailError::Build(format!("invalid sender address: {e}")))?;

        Ok(Self { transport, from })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&mail.subject);

        for recipient in &mail.to {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| MailError::Build(format!("invalid recipient {recipient}: {e}")))?;
            builder = builder.to(to);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        mail.validate()?;
        let message = self.build_message(mail)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::info!(
            mail_id = %mail.id,
            to = ?mail.to,
            subject = %mail.subject,
            "Mail sent via SMTP"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
