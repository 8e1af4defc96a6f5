//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use nodebase_core::{JobEvent, Session, SessionRecord, User, UserId, Workflow};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Combined storage trait
#[async_trait]
pub trait Storage:
    UserStorage + SessionStorage + WorkflowStorage + DispatchStorage + Send + Sync
{
}

/// Storage for user accounts
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Get a user by ID
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;

    /// Get a user by email
    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Insert a new user; fails with `Conflict` when the email is taken
    async fn insert_user(&self, user: User) -> StorageResult<()>;

    /// Flip the entitlement flag; returns false when the user is unknown.
    /// This is the hook an external billing integration calls.
    async fn set_entitlement(&self, id: &UserId, entitled: bool) -> StorageResult<bool>;

    /// Count all users
    async fn count_users(&self) -> StorageResult<usize>;
}

/// Storage for session records (keyed by token digest)
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Get a session by token digest
    async fn get_session(&self, token_digest: &str) -> StorageResult<Option<SessionRecord>>;

    /// Insert a session record
    async fn insert_session(&self, record: SessionRecord) -> StorageResult<()>;

    /// Delete a session by token digest; returns whether one existed
    async fn delete_session(&self, token_digest: &str) -> StorageResult<bool>;

    /// Drop expired sessions, returning how many were removed
    async fn purge_expired_sessions(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<usize>;
}

/// Storage for workflow records
#[async_trait]
pub trait WorkflowStorage: Send + Sync {
    /// List workflows owned by a user, oldest first
    async fn list_workflows_for_owner(&self, owner: &UserId) -> StorageResult<Vec<Workflow>>;

    /// Insert a workflow
    async fn insert_workflow(&self, workflow: Workflow) -> StorageResult<()>;

    /// Count all workflows
    async fn count_workflows(&self) -> StorageResult<usize>;
}

/// Journal of dispatched job events
#[async_trait]
pub trait DispatchStorage: Send + Sync {
    /// Record a dispatched event
    async fn record_dispatch(&self, event: &JobEvent) -> StorageResult<()>;

    /// List recent dispatches, newest first
    async fn list_dispatches(&self, limit: usize) -> StorageResult<Vec<JobEvent>>;

    /// Count all dispatched events
    async fn count_dispatches(&self) -> StorageResult<usize>;
}

/// Convenience used by tests and handlers to assemble a per-request
/// [`Session`] from its stored parts.
pub fn session_from_parts(user: &User, record: &SessionRecord) -> Session {
    Session {
        user_id: user.id,
        email: user.email.clone(),
        entitled: user.entitled,
        expires_at: record.expires_at,
    }
}
