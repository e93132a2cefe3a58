//! Postgres-backed job record store.
//!
//! ## Schema
//!
//! One row per job in `jobs`, created by [`PostgresJobStore::ensure_schema`]:
//!
//! | column | type | notes |
//! |--------|------|-------|
//! | `id` | `UUID` | primary key, never reused |
//! | `create_at` | `TIMESTAMPTZ` | set once on insert |
//! | `update_at` | `TIMESTAMPTZ` | refreshed with every status change |
//! | `status` | `TEXT` | `pending`, `completed` or `failed` |
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |
//! | Row column or status decode failure | N/A | `Decode` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use jobhub_core::{Job, JobId, JobStatus};

use super::store::{JobRecordStore, StoreError};

const CREATE_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id UUID PRIMARY KEY,
    create_at TIMESTAMPTZ NOT NULL,
    update_at TIMESTAMPTZ NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed'))
)
"#;

/// Durable job store on a SQLx connection pool.
///
/// `Send + Sync`; clones share the pool.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and make sure the `jobs` table exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the `jobs` table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_JOBS_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobRecordStore for PostgresJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id), err)]
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, create_at, update_at, status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.status.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(job.id)
            } else {
                map_sqlx_error("insert", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn select_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, create_at, update_at, status
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("select_by_id", e))?;

        row.map(|r| decode_job(&r)).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id, status = %status), err)]
    async fn update_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, update_at = $2
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(updated_at)
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_status_by_id", e))?;

        Ok(result.rows_affected())
    }
}

fn decode_job(row: &sqlx::postgres::PgRow) -> Result<Job, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(e.to_string());

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("create_at").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("update_at").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    let status: JobStatus = status
        .parse()
        .map_err(|e: jobhub_core::DomainError| StoreError::Decode(e.to_string()))?;
    Job::from_record(JobId::from_uuid(id), created_at, updated_at, status)
        .map_err(|e| StoreError::Decode(e.to_string()))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Storage(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Decode(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
