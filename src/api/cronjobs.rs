//! Cron job control endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::scheduler::JobStatus;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub name: String,
    /// Optional new interval, applied before starting
    pub interval_number: Option<i64>,
    pub interval_base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIntervalRequest {
    pub name: String,
    pub interval_number: i64,
    pub interval_base: String,
}

#[derive(Debug, Serialize)]
pub struct JobActionResponse {
    pub name: String,
    pub action: &'static str,
    /// `false` when start found the job already running
    pub changed: bool,
    pub job: Option<JobStatus>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobStatus>,
}

async fn job_status(state: &AppState, name: &str) -> Option<JobStatus> {
    let key = name.to_lowercase();
    state
        .scheduler
        .jobs()
        .await
        .into_iter()
        .find(|job| job.name == key)
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

/// GET /api/v1/cronjobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.scheduler.jobs().await,
    })
}

/// POST /api/v1/cronjobs/start
pub async fn start_job(
    State(state): State<AppState>,
    Json(request): Json<StartJobRequest>,
) -> Result<Json<JobActionResponse>> {
    require_name(&request.name)?;
    if !state.scheduler.contains(&request.name) {
        return Err(AppError::NotFound(format!("cron job not found: {}", request.name)));
    }

    match (request.interval_number, request.interval_base.as_deref()) {
        (Some(number), Some(base)) => {
            state
                .scheduler
                .update_interval(&request.name, number, base)
                .await?;
        }
        (None, None) => {}
        _ => {
            return Err(AppError::Validation(
                "interval_number and interval_base must be given together".to_string(),
            ))
        }
    }

    let changed = state.scheduler.start(&request.name).await;
    tracing::info!(job = %request.name, started = changed, "Cron job start requested");

    Ok(Json(JobActionResponse {
        job: job_status(&state, &request.name).await,
        name: request.name,
        action: "start",
        changed,
    }))
}

/// POST /api/v1/cronjobs/stop
pub async fn stop_job(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Json<JobActionResponse>> {
    require_name(&request.name)?;
    state.scheduler.stop(&request.name).await?;
    tracing::info!(job = %request.name, "Cron job stopped");

    Ok(Json(JobActionResponse {
        job: job_status(&state, &request.name).await,
        name: request.name,
        action: "stop",
        changed: true,
    }))
}

/// POST /api/v1/cronjobs/restart
pub async fn restart_job(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<Json<JobActionResponse>> {
    require_name(&request.name)?;
    state.scheduler.restart(&request.name).await?;
    tracing::info!(job = %request.name, "Cron job restarted");

    Ok(Json(JobActionResponse {
        job: job_status(&state, &request.name).await,
        name: request.name,
        action: "restart",
        changed: true,
    }))
}

/// PATCH /api/v1/cronjobs/interval
pub async fn update_interval(
    State(state): State<AppState>,
    Json(request): Json<UpdateIntervalRequest>,
) -> Result<Json<JobActionResponse>> {
    require_name(&request.name)?;
    state
        .scheduler
        .update_interval(&request.name, request.interval_number, &request.interval_base)
        .await?;

    Ok(Json(JobActionResponse {
        job: job_status(&state, &request.name).await,
        name: request.name,
        action: "update_interval",
        changed: true,
    }))
}
