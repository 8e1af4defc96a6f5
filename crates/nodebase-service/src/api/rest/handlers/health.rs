//! Health and status handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::storage::{DispatchStorage, UserStorage, WorkflowStorage};
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Service status response
#[derive(Debug, Serialize)]
pub struct ServiceStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub stats: ServiceStats,
}

/// Service statistics
#[derive(Debug, Serialize)]
pub struct ServiceStats {
    pub total_users: usize,
    pub total_workflows: usize,
    pub total_dispatches: usize,
    pub ai_backends_configured: usize,
}

/// Service status endpoint
pub async fn service_status(
    State(state): State<AppState>,
) -> ApiResult<Json<ServiceStatusResponse>> {
    let total_users = state.storage.count_users().await?;
    let total_workflows = state.storage.count_workflows().await?;
    let total_dispatches = state.storage.count_dispatches().await?;

    Ok(Json(ServiceStatusResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        stats: ServiceStats {
            total_users,
            total_workflows,
            total_dispatches,
            ai_backends_configured: state
                .ai_backends
                .iter()
                .filter(|b| b.is_configured())
                .count(),
        },
    }))
}
