//! In-process table of job ids awaiting live delivery.
//!
//! At most one subscription exists per job id. Registering again for the
//! same id replaces the previous subscription; the displaced waiter is
//! told so via [`Delivery::Superseded`] rather than being dropped.
//!
//! All operations take a plain mutex for the duration of a map operation
//! only. They never await and are safe to call from the completion
//! listener and from `Drop`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use review_core::types::{JobId, Timestamp};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// What a pending subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The serialized result record for the job.
    Result(String),
    /// A newer subscription for the same job took this one's place.
    Superseded,
}

/// Sending half handed to the registry by a waiting subscriber.
pub type DeliveryHandle = oneshot::Sender<Delivery>;

/// Identifies one registration so cleanup never evicts a replacement.
pub type SubscriptionToken = u64;

/// A pending live-delivery request.
#[derive(Debug)]
pub struct Subscription {
    pub job_id: JobId,
    pub token: SubscriptionToken,
    pub created_at: Timestamp,
    pub deadline: Instant,
    handle: DeliveryHandle,
}

impl Subscription {
    /// Deliver and close the channel. Returns `false` if the subscriber is
    /// already gone.
    pub fn deliver(self, delivery: Delivery) -> bool {
        self.handle.send(delivery).is_ok()
    }
}

/// Result of [`SubscriptionRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub token: SubscriptionToken,
    /// Whether an earlier subscription for the same job was displaced.
    pub replaced: bool,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<JobId, Subscription>>,
    next_token: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` as the live subscriber for `job_id`.
    pub fn register(&self, job_id: JobId, handle: DeliveryHandle, deadline: Instant) -> Registration {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        let subscription = Subscription {
            job_id,
            token,
            created_at: chrono::Utc::now(),
            deadline,
            handle,
        };

        let displaced = self.lock().insert(job_id, subscription);
        let replaced = match displaced {
            Some(previous) => {
                tracing::warn!(
                    job_id = %job_id,
                    previous_token = previous.token,
                    token,
                    "Subscription replaced by a newer subscriber"
                );
                previous.deliver(Delivery::Superseded);
                true
            }
            None => false,
        };

        tracing::debug!(job_id = %job_id, token, "Subscription registered");
        Registration { token, replaced }
    }

    /// Remove and return the subscription for `job_id`, if any.
    ///
    /// Exactly one caller can obtain a given subscription.
    pub fn take(&self, job_id: JobId) -> Option<Subscription> {
        self.lock().remove(&job_id)
    }

    /// Drop any subscription for `job_id` without delivering.
    pub fn remove(&self, job_id: JobId) -> bool {
        self.lock().remove(&job_id).is_some()
    }

    /// Remove the subscription for `job_id` only if it is still the one
    /// identified by `token`.
    pub fn remove_if(&self, job_id: JobId, token: SubscriptionToken) -> Option<Subscription> {
        let mut entries = self.lock();
        match entries.get(&job_id) {
            Some(sub) if sub.token == token => entries.remove(&job_id),
            _ => None,
        }
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.lock().contains_key(&job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Subscription>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
