//! [`WorkQueue`] and [`ResultStore`] backed by PostgreSQL.
//!
//! Database errors are mapped at this boundary: queue publish failures
//! become [`CoreError::DispatchFailure`], everything else
//! [`CoreError::StoreUnavailable`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use review_core::error::CoreError;
use review_core::job::{Job, JobMessage};
use review_core::queue::{ClaimedJob, WorkQueue};
use review_core::store::ResultStore;
use review_core::types::JobId;

use crate::repositories::{JobQueueRepo, ResultRepo};
use crate::DbPool;

fn unavailable(err: sqlx::Error) -> CoreError {
    CoreError::StoreUnavailable(err.to_string())
}

// ---------------------------------------------------------------------------
// PgWorkQueue
// ---------------------------------------------------------------------------

/// Work queue on the `job_queue` table. At-least-once: a claimed row is
/// leased, not removed, until [`WorkQueue::ack`].
pub struct PgWorkQueue {
    pool: DbPool,
    lease: Duration,
}

impl PgWorkQueue {
    pub fn new(pool: DbPool, lease: Duration) -> Self {
        Self { pool, lease }
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    async fn publish(&self, job: &Job) -> Result<(), CoreError> {
        let message = serde_json::to_value(JobMessage::from(job))
            .map_err(|e| CoreError::DispatchFailure(e.to_string()))?;

        JobQueueRepo::enqueue(&self.pool, job.id.as_uuid(), &message)
            .await
            .map_err(|e| CoreError::DispatchFailure(e.to_string()))?;
        Ok(())
    }

    async fn claim(&self, worker: &str) -> Result<Option<ClaimedJob>, CoreError> {
        loop {
            let Some(row) = JobQueueRepo::claim_next(&self.pool, worker, self.lease)
                .await
                .map_err(unavailable)?
            else {
                return Ok(None);
            };

            match serde_json::from_value::<JobMessage>(row.message) {
                Ok(message) => {
                    return Ok(Some(ClaimedJob {
                        job: message.into(),
                        attempt: row.attempts.max(1) as u32,
                    }));
                }
                Err(e) => {
                    // An unreadable message can never succeed; drop it and
                    // look for the next one.
                    tracing::error!(
                        job_id = %row.job_id,
                        error = %e,
                        "Discarding undecodable queue message"
                    );
                    JobQueueRepo::delete(&self.pool, row.job_id)
                        .await
                        .map_err(unavailable)?;
                }
            }
        }
    }

    async fn ack(&self, job_id: JobId) -> Result<(), CoreError> {
        JobQueueRepo::delete(&self.pool, job_id.as_uuid())
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn release(&self, job_id: JobId) -> Result<(), CoreError> {
        JobQueueRepo::release(&self.pool, job_id.as_uuid())
            .await
            .map_err(unavailable)
    }
}

// ---------------------------------------------------------------------------
// PgResultStore
// ---------------------------------------------------------------------------

/// Result store on the `job_results` table. Expired rows are invisible to
/// reads and removed by [`ResultStore::purge_expired`].
pub struct PgResultStore {
    pool: DbPool,
}

impl PgResultStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn put(&self, job_id: JobId, value: &str, ttl: Duration) -> Result<(), CoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CoreError::Validation(format!("Invalid result TTL: {e}")))?;
        ResultRepo::upsert(&self.pool, job_id.as_uuid(), value, Utc::now() + ttl)
            .await
            .map_err(unavailable)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<String>, CoreError> {
        ResultRepo::find_live(&self.pool, job_id.as_uuid())
            .await
            .map_err(unavailable)
    }

    async fn keys(&self) -> Result<Vec<String>, CoreError> {
        let ids = ResultRepo::list_live_ids(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(ids.into_iter().map(|id| id.to_string()).collect())
    }

    async fn purge_expired(&self) -> Result<u64, CoreError> {
        ResultRepo::delete_expired(&self.pool)
            .await
            .map_err(unavailable)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool).await.map_err(unavailable)
    }
}
