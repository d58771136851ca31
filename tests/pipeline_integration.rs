//! End-to-end tests of the queue → scheduler → dispatcher → mailer pipeline
//!
//! Everything runs in memory: a `MemoryQueue`, an in-memory user directory
//! and a `RecordingMailer` standing in for SMTP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use notification_dispatch_service::config::AppConfig;
use notification_dispatch_service::mail::RecordingMailer;
use notification_dispatch_service::notification::{
    handlers, ContactUs, DispatchError, ErrorKind, NotificationDispatcher, NotificationName,
    NotificationProducer,
};
use notification_dispatch_service::queue::{MemoryQueue, NotificationQueue, NotificationRecord};
use notification_dispatch_service::scheduler::{CronJob, SchedulerError, SchedulerRegistry};
use notification_dispatch_service::tasks::{SendNotificationsJob, TickOutcome, SEND_NOTIFICATIONS};
use notification_dispatch_service::template::TemplateEngine;
use notification_dispatch_service::users::{InMemoryUserDirectory, User};

const TEMPLATE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates/email");

struct Pipeline {
    queue: Arc<MemoryQueue>,
    mailer: Arc<RecordingMailer>,
    dispatcher: Arc<NotificationDispatcher>,
    job: Arc<SendNotificationsJob>,
}

fn users() -> InMemoryUserDirectory {
    InMemoryUserDirectory::with_users([
        User::new("1", "jane@example.com", "Jane"),
        User::new("2", "nameless@example.com", ""),
    ])
}

fn pipeline_with(templates: TemplateEngine, mailer: RecordingMailer) -> Pipeline {
    let queue = Arc::new(MemoryQueue::new());
    let mailer = Arc::new(mailer);
    let dispatcher = Arc::new(NotificationDispatcher::new(
        Arc::new(users()),
        Arc::new(templates),
        mailer.clone(),
        AppConfig {
            name: "Acme".to_string(),
            url: "https://acme.test".to_string(),
        },
    ));
    let job = Arc::new(SendNotificationsJob::new(queue.clone(), dispatcher.clone()));

    Pipeline {
        queue,
        mailer,
        dispatcher,
        job,
    }
}

fn pipeline() -> Pipeline {
    pipeline_with(TemplateEngine::new(TEMPLATE_DIR), RecordingMailer::new())
}

/// Payload accepted by each notification type, addressed to a known user
fn sample_payload(name: NotificationName) -> serde_json::Value {
    match name {
        NotificationName::WelcomeMail => json!({"email": "jane@example.com"}),
        NotificationName::Otp => json!({"email": "jane@example.com", "otp_token": 482913}),
        NotificationName::ResetPassword => json!({"email": "jane@example.com", "token": 77}),
        NotificationName::EmailVerification => {
            json!({"email": "jane@example.com", "code": 1234, "token": "abc"})
        }
        NotificationName::MagicLink => {
            json!({"email": "jane@example.com", "magic_link": "https://acme.test/m/xyz"})
        }
        NotificationName::Squeeze => json!({"first_name": "Sam", "email": "sam@example.com"}),
        NotificationName::ContactUs => json!({
            "email": "a@b.com",
            "name": "A",
            "subject": "Hi",
            "message": "Hello"
        }),
    }
}

fn record(name: &str, data: serde_json::Value) -> NotificationRecord {
    NotificationRecord::new(name, data.to_string())
}

// ============================================================================
// Dispatch correctness
// ============================================================================

#[tokio::test]
async fn test_every_type_routes_to_its_own_handler() {
    let p = pipeline();

    for name in NotificationName::ALL {
        let outcome = p
            .dispatcher
            .dispatch(&record(name.as_str(), sample_payload(name)))
            .await
            .unwrap_or_else(|e| panic!("{name} failed: {e}"));

        assert_eq!(outcome.name, name);
        assert_eq!(outcome.template, name.template());
    }

    let sent = p.mailer.sent().await;
    assert_eq!(sent.len(), NotificationName::ALL.len());

    let subjects: Vec<&str> = sent.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec![
            handlers::WELCOME_SUBJECT,
            "Secure Login: Your OTP Code Is: 482913",
            handlers::RESET_PASSWORD_SUBJECT,
            handlers::EMAIL_VERIFICATION_SUBJECT,
            handlers::MAGIC_LINK_SUBJECT,
            handlers::SQUEEZE_SUBJECT,
            handlers::CONTACT_US_SUBJECT,
        ]
    );
    assert_eq!(sent[5].to, vec!["sam@example.com".to_string()]);
    assert_eq!(sent[6].to, vec!["a@b.com".to_string()]);
}

#[tokio::test]
async fn test_rendered_bodies_carry_payload_values() {
    let p = pipeline();

    p.dispatcher
        .dispatch(&record("send_otp", sample_payload(NotificationName::Otp)))
        .await
        .unwrap();
    p.dispatcher
        .dispatch(&record(
            "send_reset_password_mail",
            sample_payload(NotificationName::ResetPassword),
        ))
        .await
        .unwrap();

    let sent = p.mailer.sent().await;
    assert!(sent[0].body.contains("482913"));
    assert!(sent[1].body.contains("https://acme.test/reset-password/"));
    assert!(sent[1].body.contains("77"));
}

#[tokio::test]
async fn test_unknown_type_is_an_error() {
    let p = pipeline();

    let err = p
        .dispatcher
        .dispatch(&record("unknown_type", json!({"email": "a@b.com"})))
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::UnknownNotificationType(ref n) if n == "unknown_type"));
    assert_eq!(err.kind(), ErrorKind::UnknownNotificationType);
    assert_eq!(p.mailer.sent_count().await, 0);
    assert_eq!(p.dispatcher.stats().failed, 1);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let p = pipeline();

    let err = p
        .dispatcher
        .dispatch(&record("send_welcome_mail", json!({"email": "ghost@example.com"})))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(p.mailer.sent_count().await, 0);
}

// ============================================================================
// Enrichment
// ============================================================================

#[tokio::test]
async fn test_display_name_falls_back_to_email() {
    let p = pipeline();

    p.dispatcher
        .dispatch(&record("send_welcome_mail", json!({"email": "jane@example.com"})))
        .await
        .unwrap();
    p.dispatcher
        .dispatch(&record("send_welcome_mail", json!({"email": "nameless@example.com"})))
        .await
        .unwrap();

    let sent = p.mailer.sent().await;
    assert!(sent[0].body.contains("Jane"));
    assert!(sent[1].body.contains("nameless@example.com"));
}

// ============================================================================
// Queue draining
// ============================================================================

#[tokio::test]
async fn test_contact_us_tick_sends_mail() {
    let p = pipeline();
    p.queue
        .push(&record("send_contact_us", sample_payload(NotificationName::ContactUs)))
        .await
        .unwrap();

    let outcome = p.job.tick().await;

    let TickOutcome::Dispatched { record, outcome } = outcome else {
        panic!("expected a dispatched tick, got {outcome:?}");
    };
    assert!(record.sent);
    assert_eq!(outcome.name, NotificationName::ContactUs);
    assert_eq!(outcome.recipient, "a@b.com");

    let sent = p.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["a@b.com".to_string()]);
    assert!(sent[0].body.contains("Hello"));
}

#[tokio::test]
async fn test_unknown_type_tick_keeps_running() {
    let p = pipeline();
    p.queue
        .push(&record("unknown_type", json!({})))
        .await
        .unwrap();
    p.queue
        .push(&record("send_contact_us", sample_payload(NotificationName::ContactUs)))
        .await
        .unwrap();

    assert!(matches!(p.job.tick().await, TickOutcome::Failed { .. }));
    assert_eq!(p.mailer.sent_count().await, 0);

    assert!(matches!(p.job.tick().await, TickOutcome::Dispatched { .. }));
    assert_eq!(p.mailer.sent_count().await, 1);
}

#[tokio::test]
async fn test_empty_queue_tick_is_idle() {
    let p = pipeline();

    assert!(matches!(p.job.tick().await, TickOutcome::Idle));
    assert_eq!(p.mailer.sent_count().await, 0);
    assert_eq!(p.dispatcher.stats().failed, 0);
}

#[tokio::test]
async fn test_popped_records_are_delivered_once() {
    let p = pipeline();
    let producer = NotificationProducer::new(p.queue.clone());

    for i in 0..3 {
        producer
            .enqueue(ContactUs {
                name: format!("Sender {i}"),
                email: format!("user{i}@example.com"),
                subject: "Hi".to_string(),
                message: "Hello".to_string(),
            })
            .await
            .unwrap();
    }

    for _ in 0..5 {
        p.job.tick().await;
    }

    let sent = p.mailer.sent().await;
    let recipients: Vec<String> = sent.iter().flat_map(|m| m.to.clone()).collect();
    assert_eq!(
        recipients,
        vec!["user0@example.com", "user1@example.com", "user2@example.com"]
    );
    assert_eq!(p.queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_delivery_is_dropped() {
    let p = pipeline_with(
        TemplateEngine::new(TEMPLATE_DIR),
        RecordingMailer::failing("relay refused"),
    );
    p.queue
        .push(&record("send_contact_us", sample_payload(NotificationName::ContactUs)))
        .await
        .unwrap();

    assert!(matches!(p.job.tick().await, TickOutcome::Failed { .. }));
    assert!(matches!(p.job.tick().await, TickOutcome::Idle));
}

// ============================================================================
// Scheduler driving the drain job
// ============================================================================

async fn inline_templates() -> TemplateEngine {
    let templates = TemplateEngine::new("missing-template-dir");
    templates
        .register_inline("default", "<p>{{firstname}}: {{message}}</p>")
        .await
        .unwrap();
    templates
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_drains_queue_on_interval() {
    let p = pipeline_with(inline_templates().await, RecordingMailer::new());
    for _ in 0..3 {
        p.queue
            .push(&record("send_contact_us", sample_payload(NotificationName::ContactUs)))
            .await
            .unwrap();
    }

    let scheduler = SchedulerRegistry::new();
    scheduler
        .register(SEND_NOTIFICATIONS, Duration::from_secs(5), p.job.clone())
        .unwrap();
    assert!(scheduler.start(SEND_NOTIFICATIONS).await);

    // Ticks at 0s and 5s
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(p.mailer.sent_count().await, 2);
    assert_eq!(p.queue.len().await.unwrap(), 1);

    scheduler.stop(SEND_NOTIFICATIONS).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(p.mailer.sent_count().await, 2);
}

#[tokio::test]
async fn test_rejected_interval_update_keeps_previous_interval() {
    let p = pipeline();
    let scheduler = SchedulerRegistry::new();
    scheduler
        .register(SEND_NOTIFICATIONS, Duration::from_secs(5), p.job.clone())
        .unwrap();

    let updated = scheduler
        .update_interval(SEND_NOTIFICATIONS, 10, "minute")
        .await
        .unwrap();
    assert_eq!(updated, Duration::from_secs(600));

    let rejected = scheduler.update_interval(SEND_NOTIFICATIONS, 0, "minute").await;
    assert_eq!(rejected, Err(SchedulerError::InvalidIntervalNumber(0)));
    assert_eq!(
        scheduler.interval(SEND_NOTIFICATIONS),
        Some(Duration::from_secs(600))
    );
}

/// Sleeps through its tick and records the highest overlap seen
#[derive(Default)]
struct OverlapTracker {
    active: AtomicUsize,
    max_active: AtomicUsize,
    ticks: AtomicUsize,
}

#[async_trait::async_trait]
impl CronJob for OverlapTracker {
    async fn run(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn test_manual_tick_never_overlaps_scheduled_tick() {
    let tracker = Arc::new(OverlapTracker::default());
    let scheduler = Arc::new(SchedulerRegistry::new());
    scheduler
        .register("tracker", Duration::from_secs(1), tracker.clone())
        .unwrap();

    scheduler.start("tracker").await;
    let manual = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                scheduler.run_once("tracker").await.unwrap();
            }
        })
    };

    tokio::time::sleep(Duration::from_secs(20)).await;
    manual.await.unwrap();
    scheduler.stop("tracker").await.unwrap();

    assert!(tracker.ticks.load(Ordering::SeqCst) >= 4);
    assert_eq!(tracker.max_active.load(Ordering::SeqCst), 1);
}
