//! Repository for the `job_queue` table.

use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::queued_job::QueuedJob;

/// Column list for `job_queue` queries.
const COLUMNS: &str = "job_id, message, attempts, claimed_by, enqueued_at, visible_at";

pub struct JobQueueRepo;

impl JobQueueRepo {
    /// Insert a job message. Re-inserting an existing id is a no-op.
    ///
    /// Returns `true` if a new row was written.
    pub async fn enqueue(
        pool: &PgPool,
        job_id: Uuid,
        message: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO job_queue (job_id, message) VALUES ($1, $2) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(job_id)
        .bind(message)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically lease the oldest visible job to `worker` for `lease`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row. Rows whose lease ran out are visible again.
    pub async fn claim_next(
        pool: &PgPool,
        worker: &str,
        lease: Duration,
    ) -> Result<Option<QueuedJob>, sqlx::Error> {
        let query = format!(
            "UPDATE job_queue \
             SET attempts = attempts + 1, claimed_by = $1, \
                 visible_at = NOW() + make_interval(secs => $2) \
             WHERE job_id = ( \
                 SELECT job_id FROM job_queue \
                 WHERE visible_at <= NOW() \
                 ORDER BY enqueued_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(worker)
            .bind(lease.as_secs_f64())
            .fetch_optional(pool)
            .await
    }

    /// Delete an acknowledged (or unreadable) job.
    pub async fn delete(pool: &PgPool, job_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_queue WHERE job_id = $1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// End a lease early so the job is claimable again right away.
    pub async fn release(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE job_queue SET visible_at = NOW(), claimed_by = NULL WHERE job_id = $1",
        )
        .bind(job_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, job_id: Uuid) -> Result<Option<QueuedJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_queue WHERE job_id = $1");
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }
}
