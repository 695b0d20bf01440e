//! SQLite-backed context store.
//!
//! Keeps the latest state per context id (checkpointing is
//! upsert-in-place, not append-only history). The schema is created
//! idempotently on connect. The `cancelled` column is authoritative and
//! sticky: an executor checkpoint never clears a cancellation requested by an
//! external actor, and `load` folds the column back into the decoded context.
//!
//! Database schema:
//! - `contexts.id` ← context id (primary key)
//! - `contexts.status` ← encoded `WorkflowStatus`
//! - `contexts.current_step` ← step index
//! - `contexts.cancelled` ← cancellation flag (0/1)
//! - `contexts.context_json` ← serialized `PersistedContext`
//! - `contexts.created_at` / `contexts.updated_at` ← RFC3339 timestamps

use std::sync::Arc;

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::instrument;

use super::persistence::PersistedContext;
use super::store::{ContextStore, Result, StoreError};
use crate::context::ExecutionContext;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contexts (
    id           TEXT PRIMARY KEY,
    status       TEXT NOT NULL,
    current_step INTEGER NOT NULL,
    cancelled    INTEGER NOT NULL DEFAULT 0,
    context_json TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_contexts_status ON contexts (status);
"#;

/// Durable context store over a SQLite connection pool.
pub struct SqliteContextStore {
    pool: Arc<SqlitePool>,
}

impl std::fmt::Debug for SqliteContextStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContextStore").finish()
    }
}

impl SqliteContextStore {
    /// Connect (or create) a SQLite database at `database_url` and ensure the
    /// schema exists. Example URL: `"sqlite://reportflow.db"`.
    #[must_use = "store must be used to persist contexts"]
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("connect error: {e}"),
            })?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("schema creation: {e}"),
            })?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn decode_row(row: &SqliteRow) -> Result<ExecutionContext> {
        let json: String = row.try_get("context_json").map_err(|e| StoreError::Backend {
            message: format!("context_json read: {e}"),
        })?;
        let cancelled: i64 = row.try_get("cancelled").map_err(|e| StoreError::Backend {
            message: format!("cancelled read: {e}"),
        })?;
        let persisted = PersistedContext::from_json_str(&json)?;
        let mut context = ExecutionContext::try_from(persisted)?;
        // The column is authoritative over the snapshot inside the JSON.
        context.cancelled = cancelled != 0;
        Ok(context)
    }
}

#[async_trait::async_trait]
impl ContextStore for SqliteContextStore {
    #[instrument(skip(self, context), fields(context = %context.id, step = context.current_step), err)]
    async fn save(&self, context: &ExecutionContext) -> Result<()> {
        let persisted = PersistedContext::from(context);
        let json = persisted.to_json_string()?;

        sqlx::query(
            r#"
            INSERT INTO contexts (id, status, current_step, cancelled, context_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                status       = excluded.status,
                current_step = excluded.current_step,
                cancelled    = MAX(contexts.cancelled, excluded.cancelled),
                context_json = excluded.context_json,
                updated_at   = excluded.updated_at
            "#,
        )
        .bind(&persisted.id)
        .bind(&persisted.status)
        .bind(persisted.current_step as i64)
        .bind(i64::from(persisted.cancelled))
        .bind(&json)
        .bind(&persisted.created_at)
        .bind(&persisted.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("upsert context: {e}"),
        })?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load(&self, id: &str) -> Result<Option<ExecutionContext>> {
        let row: Option<SqliteRow> =
            sqlx::query("SELECT context_json, cancelled FROM contexts WHERE id = ?1")
                .bind(id)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| StoreError::Backend {
                    message: format!("select context: {e}"),
                })?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Self::decode_row(&row)?)),
        }
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM contexts ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("list ids: {e}"),
            })?;
        Ok(rows.iter().map(|r| r.get::<String, _>("id")).collect())
    }

    async fn cancellation_requested(&self, id: &str) -> Result<bool> {
        let row: Option<SqliteRow> =
            sqlx::query("SELECT cancelled FROM contexts WHERE id = ?1")
                .bind(id)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| StoreError::Backend {
                    message: format!("select cancelled: {e}"),
                })?;
        let row = row.ok_or_else(|| StoreError::NotFound {
            id: id.to_string(),
        })?;
        let cancelled: i64 = row.get("cancelled");
        Ok(cancelled != 0)
    }

    #[instrument(skip(self), err)]
    async fn request_cancellation(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE contexts SET cancelled = 1, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend {
            message: format!("update cancelled: {e}"),
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
