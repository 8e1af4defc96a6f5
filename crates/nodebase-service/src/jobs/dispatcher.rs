//! Job event dispatch.

use crate::error::DispatchError;
use crate::storage::{DispatchStorage, Storage};
use nodebase_core::{JobEvent, JobName};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Acknowledgment returned once an event has been journaled and enqueued.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchAck {
    pub event_id: Uuid,
}

/// One-way submission of named events to the background worker.
///
/// `send` journals the event, then enqueues it, then acknowledges — so the
/// journal entry and queue push happen-before the caller sees the ack,
/// while job completion stays unordered with respect to the response.
#[derive(Clone)]
pub struct JobDispatcher {
    storage: Arc<dyn Storage>,
    tx: mpsc::UnboundedSender<JobEvent>,
}

impl JobDispatcher {
    pub fn new(storage: Arc<dyn Storage>, tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        Self { storage, tx }
    }

    /// Submit an event. Failure here fails the calling mutation: the
    /// dispatch is that mutation's only effect.
    pub async fn send(
        &self,
        name: JobName,
        payload: Option<serde_json::Value>,
    ) -> Result<DispatchAck, DispatchError> {
        let event = JobEvent::new(name, payload);
        self.storage.record_dispatch(&event).await?;
        self.tx
            .send(event.clone())
            .map_err(|_| DispatchError::QueueClosed)?;

        tracing::debug!(event = %name, event_id = %event.id, "job event dispatched");
        Ok(DispatchAck { event_id: event.id })
    }
}
