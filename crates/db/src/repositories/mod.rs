//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod job_queue_repo;
pub mod result_repo;

pub use job_queue_repo::JobQueueRepo;
pub use result_repo::ResultRepo;
