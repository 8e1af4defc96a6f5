//! Background job worker.
//!
//! Single consumer of the dispatch queue. Handler failures are logged and
//! never reach a request; retries and completion tracking are out of scope
//! for the dispatching side.

use crate::error::StorageError;
use crate::storage::{Storage, WorkflowStorage};
use nodebase_adapters::{generate, AiBackendConfig, GenerationRequest};
use nodebase_core::{JobEvent, JobName, UserId, Workflow};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

const AI_SYSTEM_PROMPT: &str = "You are a helpful assistant for generating text.";
const AI_TEST_PROMPT: &str = "What is 2 + 2?";

#[derive(Debug, Error)]
enum WorkerError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Consumes job events dispatched by request handlers.
pub struct JobWorker {
    storage: Arc<dyn Storage>,
    ai_backends: Vec<AiBackendConfig>,
    http: reqwest::Client,
}

impl JobWorker {
    pub fn new(
        storage: Arc<dyn Storage>,
        ai_backends: Vec<AiBackendConfig>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            storage,
            ai_backends,
            http,
        }
    }

    /// Run until the dispatch side hangs up, draining remaining events.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<JobEvent>) {
        while let Some(event) = rx.recv().await {
            if let Err(error) = self.handle(&event).await {
                tracing::error!(event = %event.name, event_id = %event.id, %error, "job failed");
            }
        }
        tracing::info!("job worker stopped");
    }

    async fn handle(&self, event: &JobEvent) -> Result<(), WorkerError> {
        match event.name {
            JobName::WorkflowCreate => self.create_workflow(event).await,
            JobName::AiExecute => {
                self.execute_ai().await;
                Ok(())
            }
        }
    }

    async fn create_workflow(&self, event: &JobEvent) -> Result<(), WorkerError> {
        let owner: UserId = event
            .payload
            .as_ref()
            .and_then(|payload| payload.get("user_id"))
            .cloned()
            .ok_or_else(|| WorkerError::InvalidPayload("missing user_id".into()))
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|e| WorkerError::InvalidPayload(e.to_string()))
            })?;

        let workflow = Workflow::untitled(owner);
        let workflow_id = workflow.id;
        self.storage.insert_workflow(workflow).await?;

        tracing::info!(%workflow_id, owner = %owner, "workflow created");
        Ok(())
    }

    /// Run the generation smoke test against every configured backend.
    /// Per-backend failures are logged; one provider going down must not
    /// hide the others' results.
    async fn execute_ai(&self) {
        let configured: Vec<&AiBackendConfig> = self
            .ai_backends
            .iter()
            .filter(|backend| backend.is_configured())
            .collect();

        if configured.is_empty() {
            tracing::warn!("ai/execute received with no configured backend");
            return;
        }

        let request = GenerationRequest::new(AI_TEST_PROMPT).with_system(AI_SYSTEM_PROMPT);

        for backend in configured {
            match generate(&self.http, backend, &request).await {
                Ok(generation) => {
                    tracing::info!(
                        backend = %backend.label(),
                        latency_ms = generation.latency_ms,
                        output = %generation.text,
                        "ai generation complete"
                    );
                }
                Err(error) => {
                    tracing::error!(backend = %backend.label(), %error, "ai generation failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, WorkflowStorage};
    use serde_json::json;

    fn worker(storage: Arc<InMemoryStorage>) -> JobWorker {
        JobWorker::new(storage, Vec::new(), reqwest::Client::new())
    }

    #[tokio::test]
    async fn workflow_create_event_materializes_a_row() {
        let storage = Arc::new(InMemoryStorage::new());
        let owner = UserId::new();
        let event = JobEvent::new(
            JobName::WorkflowCreate,
            Some(json!({ "user_id": owner })),
        );

        worker(storage.clone()).handle(&event).await.unwrap();

        let workflows = storage.list_workflows_for_owner(&owner).await.unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].name, "Untitled workflow");
    }

    #[tokio::test]
    async fn workflow_create_without_payload_is_rejected() {
        let storage = Arc::new(InMemoryStorage::new());
        let event = JobEvent::new(JobName::WorkflowCreate, None);

        let err = worker(storage.clone()).handle(&event).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidPayload(_)));
        assert_eq!(storage.count_workflows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ai_execute_with_no_backend_is_a_no_op() {
        let storage = Arc::new(InMemoryStorage::new());
        let event = JobEvent::new(JobName::AiExecute, None);
        // must not error; the guard lives at the API layer
        worker(storage).handle(&event).await.unwrap();
    }

    #[tokio::test]
    async fn worker_drains_the_queue_before_stopping() {
        let storage = Arc::new(InMemoryStorage::new());
        let owner = UserId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        for _ in 0..3 {
            tx.send(JobEvent::new(
                JobName::WorkflowCreate,
                Some(json!({ "user_id": owner })),
            ))
            .unwrap();
        }
        drop(tx);

        worker(storage.clone()).run(rx).await;
        assert_eq!(storage.count_workflows().await.unwrap(), 3);
    }
}
