#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The work queue did not accept the job. No job id is valid.
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),

    /// A result record exists but cannot be parsed.
    #[error("Result format error for job {job_id}: {reason}")]
    ResultFormat { job_id: String, reason: String },

    /// The result store (or another shared backend) is unreachable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
