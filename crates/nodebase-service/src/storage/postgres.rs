//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nodebase_core::{JobEvent, JobName, SessionRecord, User, UserId, Workflow, WorkflowId};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize the schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                entitled BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token_digest TEXT PRIMARY KEY,
                user_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS sessions_expires_at ON sessions(expires_at);"#,
            r#"
            CREATE TABLE IF NOT EXISTS workflows (
                id UUID PRIMARY KEY,
                owner UUID NOT NULL,
                name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS workflows_owner ON workflows(owner);"#,
            r#"
            CREATE TABLE IF NOT EXISTS job_dispatches (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                payload JSONB,
                submitted_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS job_dispatches_submitted_at ON job_dispatches(submitted_at DESC);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    fn map_query_error(e: sqlx::Error) -> StorageError {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StorageError::Conflict(db.to_string());
            }
        }
        StorageError::Query(e.to_string())
    }

    fn user_from_row(row: &sqlx::postgres::PgRow) -> Result<User, StorageError> {
        Ok(User {
            id: UserId(Self::get(row, "id")?),
            email: Self::get(row, "email")?,
            password_hash: Self::get(row, "password_hash")?,
            entitled: Self::get(row, "entitled")?,
            created_at: Self::get(row, "created_at")?,
        })
    }

    fn workflow_from_row(row: &sqlx::postgres::PgRow) -> Result<Workflow, StorageError> {
        Ok(Workflow {
            id: WorkflowId(Self::get(row, "id")?),
            owner: UserId(Self::get(row, "owner")?),
            name: Self::get(row, "name")?,
            created_at: Self::get(row, "created_at")?,
        })
    }

    fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StorageError>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(column)
            .map_err(|e| StorageError::InvalidData(format!("column {}: {}", column, e)))
    }
}

impl Storage for PostgresStorage {}

#[async_trait]
impl UserStorage for PostgresStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, password_hash, entitled, created_at FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, password_hash, entitled, created_at FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, entitled, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id.0)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.entitled)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        Ok(())
    }

    async fn set_entitlement(&self, id: &UserId, entitled: bool) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE users SET entitled = $2 WHERE id = $1")
            .bind(id.0)
            .bind(entitled)
            .execute(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_query_error)?;
        let count: i64 = Self::get(&row, "count")?;
        Ok(count as usize)
    }
}

#[async_trait]
impl SessionStorage for PostgresStorage {
    async fn get_session(&self, token_digest: &str) -> StorageResult<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT token_digest, user_id, created_at, expires_at FROM sessions WHERE token_digest = $1",
        )
        .bind(token_digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        row.map(|row| {
            Ok(SessionRecord {
                token_digest: Self::get(&row, "token_digest")?,
                user_id: UserId(Self::get::<Uuid>(&row, "user_id")?),
                created_at: Self::get(&row, "created_at")?,
                expires_at: Self::get(&row, "expires_at")?,
            })
        })
        .transpose()
    }

    async fn insert_session(&self, record: SessionRecord) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token_digest, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.token_digest)
        .bind(record.user_id.0)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        Ok(())
    }

    async fn delete_session(&self, token_digest: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
            .bind(token_digest)
            .execute(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl WorkflowStorage for PostgresStorage {
    async fn list_workflows_for_owner(&self, owner: &UserId) -> StorageResult<Vec<Workflow>> {
        let rows = sqlx::query(
            "SELECT id, owner, name, created_at FROM workflows WHERE owner = $1 ORDER BY created_at ASC",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        rows.iter().map(Self::workflow_from_row).collect()
    }

    async fn insert_workflow(&self, workflow: Workflow) -> StorageResult<()> {
        sqlx::query("INSERT INTO workflows (id, owner, name, created_at) VALUES ($1, $2, $3, $4)")
            .bind(workflow.id.0)
            .bind(workflow.owner.0)
            .bind(&workflow.name)
            .bind(workflow.created_at)
            .execute(&self.pool)
            .await
            .map_err(Self::map_query_error)?;

        Ok(())
    }

    async fn count_workflows(&self) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM workflows")
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_query_error)?;
        let count: i64 = Self::get(&row, "count")?;
        Ok(count as usize)
    }
}

#[async_trait]
impl DispatchStorage for PostgresStorage {
    async fn record_dispatch(&self, event: &JobEvent) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO job_dispatches (id, name, payload, submitted_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(event.id)
        .bind(event.name.as_str())
        .bind(event.payload.clone())
        .bind(event.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        Ok(())
    }

    async fn list_dispatches(&self, limit: usize) -> StorageResult<Vec<JobEvent>> {
        let rows = sqlx::query(
            "SELECT id, name, payload, submitted_at FROM job_dispatches ORDER BY submitted_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::map_query_error)?;

        rows.iter()
            .map(|row| {
                let name: String = Self::get(row, "name")?;
                let name = JobName::parse(&name)
                    .ok_or_else(|| StorageError::InvalidData(format!("job name {}", name)))?;
                Ok(JobEvent {
                    id: Self::get(row, "id")?,
                    name,
                    payload: Self::get(row, "payload")?,
                    submitted_at: Self::get(row, "submitted_at")?,
                })
            })
            .collect()
    }

    async fn count_dispatches(&self) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM job_dispatches")
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_query_error)?;
        let count: i64 = Self::get(&row, "count")?;
        Ok(count as usize)
    }
}
