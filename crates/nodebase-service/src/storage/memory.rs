//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use nodebase_core::{JobEvent, SessionRecord, User, UserId, Workflow};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    users: RwLock<HashMap<UserId, User>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    workflows: RwLock<Vec<Workflow>>,
    dispatches: RwLock<Vec<JobEvent>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {}

#[async_trait]
impl UserStorage for InMemoryStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn set_entitlement(&self, id: &UserId, entitled: bool) -> StorageResult<bool> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(user) => {
                user.entitled = entitled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users(&self) -> StorageResult<usize> {
        Ok(self.users.read().await.len())
    }
}

#[async_trait]
impl SessionStorage for InMemoryStorage {
    async fn get_session(&self, token_digest: &str) -> StorageResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(token_digest).cloned())
    }

    async fn insert_session(&self, record: SessionRecord) -> StorageResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.token_digest.clone(), record);
        Ok(())
    }

    async fn delete_session(&self, token_digest: &str) -> StorageResult<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(token_digest).is_some())
    }

    async fn purge_expired_sessions(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[async_trait]
impl WorkflowStorage for InMemoryStorage {
    async fn list_workflows_for_owner(&self, owner: &UserId) -> StorageResult<Vec<Workflow>> {
        let workflows = self.workflows.read().await;
        Ok(workflows
            .iter()
            .filter(|w| &w.owner == owner)
            .cloned()
            .collect())
    }

    async fn insert_workflow(&self, workflow: Workflow) -> StorageResult<()> {
        let mut workflows = self.workflows.write().await;
        workflows.push(workflow);
        Ok(())
    }

    async fn count_workflows(&self) -> StorageResult<usize> {
        Ok(self.workflows.read().await.len())
    }
}

#[async_trait]
impl DispatchStorage for InMemoryStorage {
    async fn record_dispatch(&self, event: &JobEvent) -> StorageResult<()> {
        let mut dispatches = self.dispatches.write().await;
        dispatches.push(event.clone());
        Ok(())
    }

    async fn list_dispatches(&self, limit: usize) -> StorageResult<Vec<JobEvent>> {
        let dispatches = self.dispatches.read().await;
        Ok(dispatches.iter().rev().take(limit).cloned().collect())
    }

    async fn count_dispatches(&self) -> StorageResult<usize> {
        Ok(self.dispatches.read().await.len())
    }
}
