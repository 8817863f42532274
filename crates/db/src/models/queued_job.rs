use serde::Serialize;
use sqlx::FromRow;
use review_core::types::Timestamp;
use uuid::Uuid;

/// A row from the `job_queue` table.
///
/// `visible_at` is when the row may next be claimed; a claim pushes it
/// forward by the lease duration.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub message: serde_json::Value,
    pub attempts: i32,
    pub claimed_by: Option<String>,
    pub enqueued_at: Timestamp,
    pub visible_at: Timestamp,
}
