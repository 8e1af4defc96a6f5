//! Workflow procedures.

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::storage::WorkflowStorage;
use axum::{extract::State, http::HeaderMap, Json};
use nodebase_core::{Capability, JobName, Workflow};
use serde::Serialize;
use serde_json::json;

/// Acknowledgment for fire-and-forget trigger mutations
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
}

/// List the caller's workflows. Read-only and idempotent.
pub async fn list_workflows(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Workflow>>> {
    let ctx = state.authorize(&headers, Capability::Entitled).await?;
    let session = ctx.require_session()?;

    let workflows = state
        .storage
        .list_workflows_for_owner(&session.user_id)
        .await?;
    Ok(Json(workflows))
}

/// Trigger workflow creation.
///
/// Emits the `workflow/create` event and acknowledges; the row itself is
/// materialized by the worker, unordered with respect to this response.
pub async fn create_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TriggerResponse>> {
    let ctx = state.authorize(&headers, Capability::Entitled).await?;
    let session = ctx.require_session()?;

    state
        .dispatcher
        .send(
            JobName::WorkflowCreate,
            Some(json!({ "user_id": session.user_id })),
        )
        .await?;

    tracing::info!(user_id = %session.user_id, "workflow creation triggered");

    Ok(Json(TriggerResponse {
        success: true,
        message: "Workflow creation triggered!".to_string(),
    }))
}
