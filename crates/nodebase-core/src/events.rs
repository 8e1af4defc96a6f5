//! Job event model — the boundary between request handlers and the
//! background worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named background jobs the service can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobName {
    /// Materialize a workflow row for the requesting user.
    #[serde(rename = "workflow/create")]
    WorkflowCreate,
    /// Run the AI text-generation smoke test against configured backends.
    #[serde(rename = "ai/execute")]
    AiExecute,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowCreate => "workflow/create",
            Self::AiExecute => "ai/execute",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "workflow/create" => Some(Self::WorkflowCreate),
            "ai/execute" => Some(Self::AiExecute),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope submitted to the job queue and journaled by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub name: JobName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(name: JobName, payload: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            payload,
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_names_serialize_to_their_wire_form() {
        let json = serde_json::to_string(&JobName::WorkflowCreate).unwrap();
        assert_eq!(json, "\"workflow/create\"");
        let parsed: JobName = serde_json::from_str("\"ai/execute\"").unwrap();
        assert_eq!(parsed, JobName::AiExecute);
    }

    #[test]
    fn payload_is_omitted_when_absent() {
        let event = JobEvent::new(JobName::AiExecute, None);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("payload").is_none());
    }
}
