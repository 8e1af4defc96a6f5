//! Application state for API handlers

use crate::auth::resolve_session;
use crate::error::ApiError;
use crate::jobs::JobDispatcher;
use crate::storage::Storage;
use axum::http::HeaderMap;
use chrono::Duration;
use nodebase_adapters::AiBackendConfig;
use nodebase_core::{Capability, ProcedureContext};
use std::sync::Arc;

/// Shared application state, constructed once at startup and injected into
/// every handler. No ambient singletons: everything a handler touches
/// arrives through here.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub storage: Arc<dyn Storage>,

    /// Job dispatcher
    pub dispatcher: JobDispatcher,

    /// AI backends the worker may call
    pub ai_backends: Arc<Vec<AiBackendConfig>>,

    /// Lifetime granted to new sessions
    pub session_ttl: Duration,

    /// Service version
    pub version: String,

    /// Service start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn Storage>,
        dispatcher: JobDispatcher,
        ai_backends: Vec<AiBackendConfig>,
        session_ttl_hours: i64,
    ) -> Self {
        Self {
            storage,
            dispatcher,
            ai_backends: Arc::new(ai_backends),
            session_ttl: Duration::hours(session_ttl_hours),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Resolve the request's session and run it through the capability
    /// chain the procedure was built with. The handler body only runs on
    /// `Ok`.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        capability: Capability,
    ) -> Result<ProcedureContext, ApiError> {
        let ctx = match resolve_session(self.storage.as_ref(), headers).await {
            Some(session) => ProcedureContext::with_session(session),
            None => ProcedureContext::anonymous(),
        };

        capability.check(ctx).map_err(ApiError::from)
    }

    /// Whether any AI backend is usable.
    pub fn ai_available(&self) -> bool {
        self.ai_backends.iter().any(|b| b.is_configured())
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        }
    }
}
