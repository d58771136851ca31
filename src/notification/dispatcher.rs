use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::mail::{MailError, MailTransport, OutgoingMail};
use crate::metrics::{MailMetrics, NotificationMetrics};
use crate::queue::NotificationRecord;
use crate::template::TemplateEngine;
use crate::users::UserDirectory;

use super::error::DispatchError;
use super::handlers::{self, HandlerContext, PreparedMail};
use super::names::NotificationName;
use super::payloads::Notification;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub name: NotificationName,
    pub recipient: String,
    pub subject: String,
    pub template: &'static str,
    pub mail_id: Uuid,
}

#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub dispatched: AtomicU64,
    pub failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub dispatched: u64,
    pub failed: u64,
}

/// Routes decoded notifications to their handler, renders the template and
/// sends the mail.
pub struct NotificationDispatcher {
    users: Arc<dyn UserDirectory>,
    templates: Arc<TemplateEngine>,
    mailer: Arc<dyn MailTransport>,
    app: AppConfig,
    send_timeout: Duration,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        templates: Arc<TemplateEngine>,
        mailer: Arc<dyn MailTransport>,
        app: AppConfig,
    ) -> Self {
        Self {
            users,
            templates,
            mailer,
            app,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            stats: DispatcherStats::default(),
        }
    }

    /// Upper bound for a single mail send
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Decode a queued record and send it.
    pub async fn dispatch(
        &self,
        record: &NotificationRecord,
    ) -> Result<DispatchOutcome, DispatchError> {
        match Notification::decode(record) {
            Ok(notification) => self.send(notification).await,
            Err(e) => {
                self.record_failure(&record.name, &e);
                Err(e)
            }
        }
    }

    /// Send an already decoded notification.
    pub async fn send(&self, notification: Notification) -> Result<DispatchOutcome, DispatchError> {
        let name = notification.name();

        let result = match self.prepare(&notification).await {
            Ok(prepared) => self.deliver(prepared).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(outcome) => {
                self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
                NotificationMetrics::record_dispatched(name.as_str());
                tracing::debug!(
                    name = %name,
                    recipient = %outcome.recipient,
                    mail_id = %outcome.mail_id,
                    "Notification dispatched"
                );
            }
            Err(e) => self.record_failure(name.as_str(), e),
        }

        result
    }

    async fn prepare(&self, notification: &Notification) -> Result<PreparedMail, DispatchError> {
        let ctx = HandlerContext {
            users: self.users.as_ref(),
            app: &self.app,
        };

        match notification {
            Notification::WelcomeMail(p) => handlers::welcome_mail(&ctx, p).await,
            Notification::Otp(p) => handlers::otp(&ctx, p).await,
            Notification::ResetPassword(p) => handlers::reset_password(&ctx, p).await,
            Notification::EmailVerification(p) => handlers::email_verification(&ctx, p).await,
            Notification::MagicLink(p) => handlers::magic_link(&ctx, p).await,
            Notification::Squeeze(p) => handlers::squeeze(&ctx, p).await,
            Notification::ContactUs(p) => handlers::contact_us(&ctx, p).await,
        }
    }

    async fn deliver(&self, prepared: PreparedMail) -> Result<DispatchOutcome, DispatchError> {
        let body = self
            .templates
            .render(prepared.template, &Value::Object(prepared.data))
            .await?;

        let mail = OutgoingMail::new(prepared.recipient, prepared.subject, body);
        let started = Instant::now();

        match tokio::time::timeout(self.send_timeout, self.mailer.send(&mail)).await {
            Ok(Ok(())) => MailMetrics::record_send(started.elapsed()),
            Ok(Err(e)) => return Err(DispatchError::Delivery(e)),
            Err(_) => {
                MailMetrics::record_timeout();
                return Err(DispatchError::Delivery(MailError::Timeout(self.send_timeout)));
            }
        }

        let OutgoingMail {
            id, mut to, subject, ..
        } = mail;

        Ok(DispatchOutcome {
            name: prepared.name,
            recipient: to.pop().unwrap_or_default(),
            subject,
            template: prepared.template,
            mail_id: id,
        })
    }

    fn record_failure(&self, name: &str, error: &DispatchError) {
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        NotificationMetrics::record_failed(name, error.kind().as_str());
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            dispatched: self.stats.dispatched.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    pub fn mailer_name(&self) -> &'static str {
        self.mailer.name()
    }
}
