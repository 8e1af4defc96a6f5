#![deny(unsafe_code)]

//! Core nodebase domain: identities, sessions, the procedure capability
//! chain, and the job event model shared by the service and its workers.

pub mod auth;
pub mod events;
pub mod types;

pub use auth::{AuthError, Capability, ProcedureContext};
pub use events::{JobEvent, JobName};
pub use types::{Session, SessionRecord, User, UserId, Workflow, WorkflowId};
