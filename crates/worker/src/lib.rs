//! Reference worker for contract review jobs.
//!
//! Claims jobs from the [`WorkQueue`], runs a [`DocumentProcessor`], stores
//! the [`ResultRecord`] and announces it on the [`CompletionBus`]. The
//! store write always precedes the announcement, so a subscriber that
//! misses the announcement still finds the record.

pub mod config;
pub mod processor;

use std::sync::Arc;
use std::time::Duration;

use review_core::completion::CompletionEvent;
use review_core::error::CoreError;
use review_core::queue::{ClaimedJob, WorkQueue};
use review_core::result::ResultRecord;
use review_core::store::ResultStore;
use review_events::CompletionBus;
use tokio_util::sync::CancellationToken;

pub use config::{ConfigError, WorkerConfig};
pub use processor::{ClauseSummaryProcessor, DocumentProcessor, ProcessError};

/// Runtime settings for a [`Worker`].
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Identifies this worker in queue leases and logs.
    pub name: String,
    /// How long stored results stay readable.
    pub result_ttl: Duration,
    /// Delay between queue polls when the queue is empty.
    pub poll_interval: Duration,
}

pub struct Worker {
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    bus: Arc<dyn CompletionBus>,
    processor: Arc<dyn DocumentProcessor>,
    settings: WorkerSettings,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ResultStore>,
        bus: Arc<dyn CompletionBus>,
        processor: Arc<dyn DocumentProcessor>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            queue,
            store,
            bus,
            processor,
            settings,
        }
    }

    /// Poll the queue until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        tracing::info!(
            worker = %self.settings.name,
            poll_interval_ms = self.settings.poll_interval.as_millis() as u64,
            "Worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker = %self.settings.name, "Worker shutting down");
                    break;
                }
                _ = ticker.tick() => self.drain(&cancel).await,
            }
        }
    }

    /// Process jobs until the queue is empty.
    async fn drain(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match self.queue.claim(&self.settings.name).await {
                Ok(Some(claimed)) => {
                    if let Err(e) = self.handle(claimed).await {
                        tracing::error!(error = %e, "Job handling failed");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim job");
                    break;
                }
            }
        }
    }

    /// Process one claimed job: store its result, announce it, ack it.
    ///
    /// A processing error still produces a record (with `Error` status).
    /// If the record cannot be stored the job is released for redelivery.
    pub async fn handle(&self, claimed: ClaimedJob) -> Result<ResultRecord, CoreError> {
        let job = claimed.job;
        tracing::info!(
            job_id = %job.id,
            attempt = claimed.attempt,
            file_name = %job.payload.file_name,
            "Processing job",
        );

        let record = match self.processor.process(&job.payload).await {
            Ok(body) => ResultRecord::ready(job.id, body),
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Job processing failed");
                ResultRecord::failed(job.id, e.to_string())
            }
        };

        if let Err(e) = self.store.put_record(&record, self.settings.result_ttl).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to store result, releasing job");
            if let Err(release_err) = self.queue.release(job.id).await {
                tracing::error!(job_id = %job.id, error = %release_err, "Failed to release job");
            }
            return Err(e);
        }

        // The bus is a latency optimization; the stored record is
        // authoritative, so a failed announcement is not fatal.
        match CompletionEvent::for_record(&record) {
            Ok(event) => {
                if let Err(e) = self.bus.publish(&event).await {
                    tracing::warn!(job_id = %job.id, error = %e, "Failed to announce completion");
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to encode completion");
            }
        }

        self.queue.ack(job.id).await?;
        tracing::info!(job_id = %job.id, status = ?record.status, "Job completed");

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use review_core::job::{Clause, Job, JobPayload};
    use review_core::queue::MemoryWorkQueue;
    use review_core::result::ResultStatus;
    use review_core::store::MemoryResultStore;
    use review_events::LocalCompletionBus;

    use super::*;

    struct Harness {
        queue: Arc<MemoryWorkQueue>,
        store: Arc<MemoryResultStore>,
        bus: Arc<LocalCompletionBus>,
        worker: Worker,
    }

    fn harness_with(processor: Arc<dyn DocumentProcessor>) -> Harness {
        let queue = Arc::new(MemoryWorkQueue::new(Duration::from_secs(60)));
        let store = Arc::new(MemoryResultStore::new());
        let bus = Arc::new(LocalCompletionBus::default());
        let worker = Worker::new(
            queue.clone(),
            store.clone(),
            bus.clone(),
            processor,
            WorkerSettings {
                name: "test-worker".into(),
                result_ttl: Duration::from_secs(1800),
                poll_interval: Duration::from_millis(10),
            },
        );
        Harness {
            queue,
            store,
            bus,
            worker,
        }
    }

    fn job() -> Job {
        Job::new(JobPayload {
            file_name: "lease.pdf".into(),
            extracted_text: "Lease. Rent is due monthly.".into(),
            header: Some("Lease".into()),
            clauses: vec![Clause {
                index: 1,
                text: "Rent is due monthly.".into(),
            }],
        })
    }

    #[tokio::test]
    async fn stores_announces_and_acks() {
        let h = harness_with(Arc::new(ClauseSummaryProcessor));
        let mut completions = h.bus.subscribe().await.unwrap();
        let j = job();
        h.queue.publish(&j).await.unwrap();

        let claimed = h.queue.claim("test-worker").await.unwrap().unwrap();
        let record = h.worker.handle(claimed).await.unwrap();

        assert_eq!(record.status, ResultStatus::Ready);
        let stored = h.store.get(j.id).await.unwrap().expect("result stored");
        assert_eq!(ResultRecord::parse(j.id, &stored).unwrap(), record);

        let raw = completions.next().await.unwrap();
        let event = CompletionEvent::parse(&raw).unwrap();
        assert_eq!(event.job_id, j.id);
        assert_eq!(event.result.as_deref(), Some(stored.as_str()));

        assert_eq!(h.queue.leased_len(), 0);
        assert_eq!(h.queue.ready_len(), 0);
    }

    struct Refuse;

    #[async_trait]
    impl DocumentProcessor for Refuse {
        async fn process(&self, _: &JobPayload) -> Result<serde_json::Value, ProcessError> {
            Err(ProcessError::Failed("model unavailable".into()))
        }
    }

    #[tokio::test]
    async fn processing_failure_is_recorded() {
        let h = harness_with(Arc::new(Refuse));
        let j = job();
        h.queue.publish(&j).await.unwrap();

        let claimed = h.queue.claim("test-worker").await.unwrap().unwrap();
        let record = h.worker.handle(claimed).await.unwrap();

        assert_eq!(record.status, ResultStatus::Error);
        assert_eq!(record.error_message(), "Processing failed: model unavailable");
        assert!(h.store.get(j.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn redelivered_job_rewrites_identical_record() {
        let h = harness_with(Arc::new(ClauseSummaryProcessor));
        let j = job();
        h.queue.publish(&j).await.unwrap();

        let first = h.queue.claim("test-worker").await.unwrap().unwrap();
        let record = h.worker.handle(first.clone()).await.unwrap();
        let stored_once = h.store.get(j.id).await.unwrap();

        // Simulate the broker redelivering the same message.
        let again = h.worker.handle(first).await.unwrap();

        assert_eq!(again, record);
        assert_eq!(h.store.get(j.id).await.unwrap(), stored_once);
        assert_eq!(h.store.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn run_drains_queue_until_cancelled() {
        let h = harness_with(Arc::new(ClauseSummaryProcessor));
        let jobs: Vec<Job> = (0..3).map(|_| job()).collect();
        for j in &jobs {
            h.queue.publish(j).await.unwrap();
        }

        let cancel = CancellationToken::new();
        let worker = Arc::new(h.worker);
        let runner = {
            let worker = Arc::clone(&worker);
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let keys = h.store.keys().await.unwrap();
                if keys.len() == jobs.len() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("all jobs should complete");

        cancel.cancel();
        runner.await.unwrap();
        assert_eq!(h.queue.ready_len(), 0);
    }
}
