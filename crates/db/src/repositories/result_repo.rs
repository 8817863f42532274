//! Repository for the `job_results` table.

use sqlx::PgPool;
use review_core::types::Timestamp;
use uuid::Uuid;

use crate::models::job_result::JobResult;

pub struct ResultRepo;

impl ResultRepo {
    /// Insert or overwrite the record for `job_id`.
    pub async fn upsert(
        pool: &PgPool,
        job_id: Uuid,
        record: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO job_results (job_id, record, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (job_id) DO UPDATE \
             SET record = EXCLUDED.record, expires_at = EXCLUDED.expires_at, stored_at = NOW()",
        )
        .bind(job_id)
        .bind(record)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch the record text if it exists and has not expired.
    pub async fn find_live(pool: &PgPool, job_id: Uuid) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT record FROM job_results WHERE job_id = $1 AND expires_at > NOW()",
        )
        .bind(job_id)
        .fetch_optional(pool)
        .await
    }

    /// Ids of all unexpired records, oldest first.
    pub async fn list_live_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT job_id FROM job_results WHERE expires_at > NOW() ORDER BY stored_at",
        )
        .fetch_all(pool)
        .await
    }

    /// Delete every expired record. Returns the number of rows removed.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_results WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetch the full row regardless of expiry.
    pub async fn find_by_id(pool: &PgPool, job_id: Uuid) -> Result<Option<JobResult>, sqlx::Error> {
        sqlx::query_as::<_, JobResult>(
            "SELECT job_id, record, stored_at, expires_at FROM job_results WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(pool)
        .await
    }
}
