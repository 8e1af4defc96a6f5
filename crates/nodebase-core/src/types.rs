//! Domain types — users, sessions, workflows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique workflow identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(pub Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// User account as persisted by the storage layer.
///
/// `entitled` is the paid-tier flag; it is flipped by the (external)
/// billing integration, never by request handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub entitled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            entitled: false,
            created_at: Utc::now(),
        }
    }
}

/// Per-request proof of authenticated identity.
///
/// Assembled by the session resolver from a stored [`SessionRecord`] and its
/// [`User`]; lives for exactly one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub entitled: bool,
    pub expires_at: DateTime<Utc>,
}

/// Stored session row. Only the sha-256 digest of the bearer token is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token_digest: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Workflow record. The creation surface takes no caller input yet, so rows
/// start out with a placeholder name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub owner: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn untitled(owner: UserId) -> Self {
        Self {
            id: WorkflowId::new(),
            owner,
            name: "Untitled workflow".to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn session_record_expiry() {
        let now = Utc::now();
        let record = SessionRecord {
            token_digest: "d".into(),
            user_id: UserId::new(),
            created_at: now,
            expires_at: now + Duration::hours(1),
        };
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::hours(2)));
        assert!(record.is_expired(now + Duration::hours(1)));
    }

    #[test]
    fn new_users_are_not_entitled() {
        let user = User::new("a@example.com", "hash");
        assert!(!user.entitled);
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
