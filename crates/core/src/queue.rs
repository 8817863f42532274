//! Work queue contract and an in-memory implementation.
//!
//! Delivery is at-least-once: a claimed job stays leased until it is
//! acknowledged, and becomes claimable again once its lease runs out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::CoreError;
use crate::job::Job;
use crate::types::JobId;

/// A job handed to a worker, with its delivery count (1 on first claim).
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: Job,
    pub attempt: u32,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Durably enqueue `job`. Returns only after the queue accepted it;
    /// any failure is a [`CoreError::DispatchFailure`].
    async fn publish(&self, job: &Job) -> Result<(), CoreError>;

    /// Lease the oldest available job to `worker`, if any.
    async fn claim(&self, worker: &str) -> Result<Option<ClaimedJob>, CoreError>;

    /// Remove a finished job from the queue.
    async fn ack(&self, job_id: JobId) -> Result<(), CoreError>;

    /// Give a leased job back for immediate redelivery.
    async fn release(&self, job_id: JobId) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// MemoryWorkQueue
// ---------------------------------------------------------------------------

struct Leased {
    job: Job,
    attempt: u32,
    lease_until: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<(Job, u32)>,
    leased: HashMap<JobId, Leased>,
}

/// Single-process work queue. Used for tests and for running without
/// PostgreSQL.
pub struct MemoryWorkQueue {
    state: Mutex<QueueState>,
    lease: Duration,
}

impl MemoryWorkQueue {
    pub fn new(lease: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            lease,
        }
    }

    /// Number of jobs waiting to be claimed (excluding leased ones).
    pub fn ready_len(&self) -> usize {
        self.lock().ready.len()
    }

    /// Number of jobs currently leased to workers.
    pub fn leased_len(&self) -> usize {
        self.lock().leased.len()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn publish(&self, job: &Job) -> Result<(), CoreError> {
        self.lock().ready.push_back((job.clone(), 0));
        Ok(())
    }

    async fn claim(&self, worker: &str) -> Result<Option<ClaimedJob>, CoreError> {
        let now = Instant::now();
        let mut state = self.lock();

        // Expired leases go back to the front: they were enqueued first.
        let expired: Vec<JobId> = state
            .leased
            .iter()
            .filter(|(_, l)| l.lease_until <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(l) = state.leased.remove(&id) {
                tracing::warn!(job_id = %id, attempt = l.attempt, "Job lease expired, redelivering");
                state.ready.push_front((l.job, l.attempt));
            }
        }

        let Some((job, attempts)) = state.ready.pop_front() else {
            return Ok(None);
        };

        let attempt = attempts + 1;
        state.leased.insert(
            job.id,
            Leased {
                job: job.clone(),
                attempt,
                lease_until: now + self.lease,
            },
        );
        tracing::debug!(job_id = %job.id, worker, attempt, "Job claimed");

        Ok(Some(ClaimedJob { job, attempt }))
    }

    async fn ack(&self, job_id: JobId) -> Result<(), CoreError> {
        self.lock().leased.remove(&job_id);
        Ok(())
    }

    async fn release(&self, job_id: JobId) -> Result<(), CoreError> {
        let mut state = self.lock();
        if let Some(l) = state.leased.remove(&job_id) {
            state.ready.push_front((l.job, l.attempt));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobPayload;

    fn job(name: &str) -> Job {
        Job::new(JobPayload {
            file_name: name.into(),
            extracted_text: "text".into(),
            header: None,
            clauses: Vec::new(),
        })
    }

    #[tokio::test]
    async fn claims_in_fifo_order() {
        let queue = MemoryWorkQueue::new(Duration::from_secs(60));
        let (a, b) = (job("a"), job("b"));
        queue.publish(&a).await.unwrap();
        queue.publish(&b).await.unwrap();

        let first = queue.claim("w").await.unwrap().unwrap();
        let second = queue.claim("w").await.unwrap().unwrap();

        assert_eq!(first.job.id, a.id);
        assert_eq!(second.job.id, b.id);
        assert!(queue.claim("w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_removes_leased_job() {
        let queue = MemoryWorkQueue::new(Duration::from_secs(60));
        let j = job("a");
        queue.publish(&j).await.unwrap();

        queue.claim("w").await.unwrap().unwrap();
        assert_eq!(queue.leased_len(), 1);

        queue.ack(j.id).await.unwrap();
        assert_eq!(queue.leased_len(), 0);
        assert_eq!(queue.ready_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_job_is_redelivered_after_lease() {
        let queue = MemoryWorkQueue::new(Duration::from_secs(5));
        let j = job("a");
        queue.publish(&j).await.unwrap();

        let first = queue.claim("w1").await.unwrap().unwrap();
        assert_eq!(first.attempt, 1);
        assert!(queue.claim("w2").await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(6)).await;

        let second = queue.claim("w2").await.unwrap().unwrap();
        assert_eq!(second.job.id, j.id);
        assert_eq!(second.attempt, 2);
    }

    #[tokio::test]
    async fn release_makes_job_claimable_again() {
        let queue = MemoryWorkQueue::new(Duration::from_secs(60));
        let j = job("a");
        queue.publish(&j).await.unwrap();

        queue.claim("w").await.unwrap().unwrap();
        queue.release(j.id).await.unwrap();

        let again = queue.claim("w").await.unwrap().unwrap();
        assert_eq!(again.job.id, j.id);
        assert_eq!(again.attempt, 2);
    }
}
