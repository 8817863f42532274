//! Result store contract and an in-memory implementation.
//!
//! Values are the serialized [`ResultRecord`] text so that records written
//! by other producers (and possibly malformed) can still be surfaced.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::CoreError;
use crate::result::ResultRecord;
use crate::types::JobId;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store `value` under `job_id` for `ttl`. Last write wins.
    async fn put(&self, job_id: JobId, value: &str, ttl: Duration) -> Result<(), CoreError>;

    /// Point read. `None` means "not finished yet" or "expired".
    async fn get(&self, job_id: JobId) -> Result<Option<String>, CoreError>;

    /// Keys of all unexpired results.
    async fn keys(&self) -> Result<Vec<String>, CoreError>;

    /// Drop expired entries; returns how many were removed.
    async fn purge_expired(&self) -> Result<u64, CoreError>;

    async fn health_check(&self) -> Result<(), CoreError>;

    /// Serialize and store a typed record.
    async fn put_record(&self, record: &ResultRecord, ttl: Duration) -> Result<(), CoreError> {
        let value = record.to_json()?;
        self.put(record.job_id, &value, ttl).await
    }
}

// ---------------------------------------------------------------------------
// MemoryResultStore
// ---------------------------------------------------------------------------

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local result store with per-key expiry.
#[derive(Default)]
pub struct MemoryResultStore {
    entries: RwLock<HashMap<JobId, Entry>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put(&self, job_id: JobId, value: &str, ttl: Duration) -> Result<(), CoreError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, entry);
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<String>, CoreError> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&job_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value.clone()))
    }

    async fn keys(&self) -> Result<Vec<String>, CoreError> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(id, _)| id.to_string())
            .collect())
    }

    async fn purge_expired(&self) -> Result<u64, CoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        Ok((before - entries.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        Ok(())
    }
}
