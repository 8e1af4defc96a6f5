//! AI trigger procedure.

use super::workflows::TriggerResponse;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, http::HeaderMap, Json};
use nodebase_core::{Capability, JobName};

/// Trigger the AI generation smoke test.
///
/// Fails fast with `NOT_IMPLEMENTED` while no backend is configured; the
/// guard runs before any dispatch so the failure has no side effect.
pub async fn test_ai(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TriggerResponse>> {
    let ctx = state.authorize(&headers, Capability::Entitled).await?;
    let session = ctx.require_session()?;

    if !state.ai_available() {
        return Err(ApiError::NotImplemented(
            "no AI generation backend is configured".into(),
        ));
    }

    state.dispatcher.send(JobName::AiExecute, None).await?;

    tracing::info!(user_id = %session.user_id, "ai execution triggered");

    Ok(Json(TriggerResponse {
        success: true,
        message: "AI execution triggered!".to_string(),
    }))
}
