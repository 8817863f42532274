//! Row structs for the queue and result tables.

pub mod job_result;
pub mod queued_job;
