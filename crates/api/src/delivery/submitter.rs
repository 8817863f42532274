//! Accepts documents for review and hands them to the work queue.

use std::sync::Arc;

use review_core::error::CoreError;
use review_core::job::{Job, JobPayload};
use review_core::queue::WorkQueue;
use review_core::types::JobId;

pub struct JobSubmitter {
    queue: Arc<dyn WorkQueue>,
}

impl JobSubmitter {
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Mint an id for `payload` and publish it.
    ///
    /// `payload` is expected to be validated already. The id is returned
    /// only after the queue accepted the job; on failure no id escapes.
    pub async fn submit(&self, payload: JobPayload) -> Result<JobId, CoreError> {
        let job = Job::new(payload);
        self.queue.publish(&job).await.map_err(|e| match e {
            CoreError::DispatchFailure(_) => e,
            other => CoreError::DispatchFailure(other.to_string()),
        })?;

        tracing::info!(
            job_id = %job.id,
            file_name = %job.payload.file_name,
            clauses = job.payload.clauses.len(),
            "Job dispatched",
        );
        Ok(job.id)
    }
}
