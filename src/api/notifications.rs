//! Enqueue endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub name: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub name: String,
    pub queued: bool,
}

/// POST /api/v1/notifications
///
/// 202 means queued, not delivered.
pub async fn enqueue_notification(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let record = state
        .producer
        .enqueue_raw(&request.name, &request.data)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            name: record.name,
            queued: true,
        }),
    ))
}
