use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;

use notification_dispatch_service::config::Settings;
use notification_dispatch_service::mail::{create_mailer, LogMailer, MailTransport};
use notification_dispatch_service::notification::NotificationDispatcher;
use notification_dispatch_service::postgres::PostgresPool;
use notification_dispatch_service::queue::create_queue;
use notification_dispatch_service::redis::{CircuitBreaker, CircuitBreakerConfig, RedisPool};
use notification_dispatch_service::scheduler::SchedulerRegistry;
use notification_dispatch_service::server::{create_app, AppState};
use notification_dispatch_service::tasks::{SendNotificationsJob, SEND_NOTIFICATIONS};
use notification_dispatch_service::telemetry::init_telemetry;
use notification_dispatch_service::template::TemplateEngine;
use notification_dispatch_service::users::create_user_directory;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Keep the guard alive until shutdown so pending spans are flushed
    let _telemetry = init_telemetry(&settings.logging, &settings.otel)?;
    tracing::info!("Configuration loaded");

    // Redis pool, only needed for the Redis queue
    let redis_pool = if settings.queue.backend == "redis" {
        let breaker = Arc::new(CircuitBreaker::with_config(CircuitBreakerConfig::from(
            &settings.redis,
        )));
        let pool = RedisPool::new(settings.redis.clone(), breaker)
            .context("Invalid Redis configuration")?;
        if let Err(e) = pool.ping().await {
            tracing::warn!(error = %e, "Redis not reachable at startup, will retry on demand");
        }
        Some(Arc::new(pool))
    } else {
        None
    };

    // PostgreSQL pool for user lookups
    let postgres_pool = if settings.database.url.is_some() {
        let breaker = Arc::new(CircuitBreaker::new());
        match PostgresPool::connect(&settings.database, breaker).await {
            Ok(pool) => Some(pool),
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                None
            }
        }
    } else {
        None
    };

    let queue = create_queue(&settings.queue, redis_pool.clone());
    let users = create_user_directory(postgres_pool.clone());
    let templates = Arc::new(TemplateEngine::new(&settings.templates.dir));
    tracing::info!(dir = %templates.dir().display(), "Template directory resolved");

    let mailer: Arc<dyn MailTransport> = match create_mailer(&settings.mail) {
        Ok(mailer) => mailer,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create mailer, falling back to log transport");
            Arc::new(LogMailer::new(settings.mail.sender()))
        }
    };

    let dispatcher = Arc::new(
        NotificationDispatcher::new(users, templates, mailer, settings.app.clone())
            .with_send_timeout(settings.mail.send_timeout()),
    );

    // Scheduler
    let scheduler = Arc::new(SchedulerRegistry::new());
    scheduler.register(
        SEND_NOTIFICATIONS,
        settings.scheduler.send_notifications_interval(),
        Arc::new(SendNotificationsJob::new(queue.clone(), dispatcher.clone())),
    )?;
    let started = scheduler.start_all(&settings.scheduler.jobs[..]).await;
    tracing::info!(started, configured = settings.scheduler.jobs.len(), "Cron jobs started");

    // Application state
    let mut state = AppState::new(settings.clone(), scheduler.clone(), queue, dispatcher);
    if let Some(pool) = redis_pool {
        state = state.with_redis_pool(pool);
    }
    if let Some(pool) = postgres_pool.clone() {
        state = state.with_postgres_pool(pool);
    }

    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler())
        .await?;

    // Let in-flight ticks finish before exiting
    tracing::info!("Stopping cron jobs...");
    scheduler.shutdown().await;

    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
