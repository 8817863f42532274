use serde::Serialize;
use sqlx::FromRow;
use review_core::types::Timestamp;
use uuid::Uuid;

/// A row from the `job_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobResult {
    pub job_id: Uuid,
    /// Serialized `ResultRecord` text, stored verbatim.
    pub record: String,
    pub stored_at: Timestamp,
    pub expires_at: Timestamp,
}
