//! Joins the subscribe path with the completion path.
//!
//! A subscriber and the completion announcement for the same job may arrive
//! in either order. The coordinator makes sure exactly one of three things
//! happens for each live subscription:
//!
//! - the result is already stored and is returned immediately,
//! - the completion listener takes the subscription and delivers to it,
//! - the deadline passes, the client goes away, or the server shuts down,
//!   and the subscription is removed without delivery.
//!
//! ```text
//!   subscribe(id)                         on_completion(event)
//!   ─────────────                         ────────────────────
//!   store.get(id) ── hit ──> Ready
//!        │ miss
//!   registry.register(id)                 registry.take(id) ── none ──> drop
//!        │                                     │ some
//!   store.get(id) ── hit ──> remove_if         deliver(result)
//!        │ miss               & Ready
//!   Pending.wait() <───────────────────────────┘
//! ```
//!
//! The second store read closes the gap where the record lands after the
//! first read but the announcement fires before registration.

use std::sync::Arc;
use std::time::Duration;

use review_core::completion::CompletionEvent;
use review_core::error::CoreError;
use review_core::result::PollOutcome;
use review_core::store::ResultStore;
use review_core::types::JobId;
use review_events::CompletionHandler;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::registry::{Delivery, SubscriptionRegistry, SubscriptionToken};

pub struct DeliveryCoordinator {
    store: Arc<dyn ResultStore>,
    registry: Arc<SubscriptionRegistry>,
    max_wait: Duration,
    shutdown: CancellationToken,
}

/// Outcome of [`DeliveryCoordinator::subscribe`].
#[derive(Debug)]
pub enum LiveSubscription {
    /// The result was already available.
    Ready(PollOutcome),
    /// Registered; await [`PendingSubscription::wait`].
    Pending(PendingSubscription),
}

/// How a pending subscription finished.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Delivered(PollOutcome),
    Superseded,
    TimedOut,
    /// The coordinator was shut down before delivery or deadline.
    Closed,
}

#[derive(Debug)]
struct Slot {
    job_id: JobId,
    token: SubscriptionToken,
    rx: oneshot::Receiver<Delivery>,
}

/// A subscription awaiting delivery.
///
/// Dropping it (deadline reached, client disconnected, request cancelled)
/// removes its registry entry unless a newer subscription replaced it.
/// A subscription for an id this service never issued holds no entry and
/// only waits out its deadline.
#[derive(Debug)]
pub struct PendingSubscription {
    slot: Option<Slot>,
    deadline: Instant,
    registry: Arc<SubscriptionRegistry>,
    shutdown: CancellationToken,
}

impl PendingSubscription {
    pub fn job_id(&self) -> Option<JobId> {
        self.slot.as_ref().map(|slot| slot.job_id)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait until delivery, the deadline, or coordinator shutdown.
    pub async fn wait(mut self) -> WaitOutcome {
        let deadline = self.deadline;
        let shutdown = self.shutdown.clone();

        let Some(slot) = self.slot.as_mut() else {
            return tokio::select! {
                _ = shutdown.cancelled() => WaitOutcome::Closed,
                _ = tokio::time::sleep_until(deadline) => WaitOutcome::TimedOut,
            };
        };

        let (job_id, token) = (slot.job_id, slot.token);
        tokio::select! {
            biased;
            delivered = &mut slot.rx => match delivered {
                Ok(Delivery::Result(raw)) => {
                    WaitOutcome::Delivered(PollOutcome::from_stored(job_id, Some(&raw)))
                }
                Ok(Delivery::Superseded) => WaitOutcome::Superseded,
                // Sender dropped without sending: the entry was taken but the
                // deliverer gave up. Nothing more will arrive.
                Err(_) => {
                    tracing::debug!(job_id = %job_id, "Delivery channel closed without a result");
                    WaitOutcome::TimedOut
                }
            },
            _ = shutdown.cancelled() => {
                tracing::debug!(job_id = %job_id, token, "Subscription closed by shutdown");
                WaitOutcome::Closed
            }
            _ = tokio::time::sleep_until(deadline) => {
                tracing::debug!(job_id = %job_id, token, "Subscription timed out");
                WaitOutcome::TimedOut
            }
        }
    }
}

impl Drop for PendingSubscription {
    fn drop(&mut self) {
        let Some(slot) = &self.slot else {
            return;
        };
        if self.registry.remove_if(slot.job_id, slot.token).is_some() {
            tracing::debug!(job_id = %slot.job_id, token = slot.token, "Subscription removed");
        }
    }
}

impl DeliveryCoordinator {
    pub fn new(
        store: Arc<dyn ResultStore>,
        registry: Arc<SubscriptionRegistry>,
        max_wait: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            max_wait,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Resolve every pending and future wait as [`WaitOutcome::Closed`].
    ///
    /// Called when the server starts draining so open streams end instead
    /// of holding shutdown until their deadlines.
    pub fn close_subscriptions(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!(pending = self.registry.len(), "Closing live subscriptions");
            self.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// One-shot read of the current state of `job_id`.
    pub async fn poll(&self, job_id: JobId) -> Result<PollOutcome, CoreError> {
        let raw = self.store.get(job_id).await?;
        Ok(PollOutcome::from_stored(job_id, raw.as_deref()))
    }

    /// [`poll`](Self::poll) by the id exactly as a client sent it.
    ///
    /// Ids are opaque to clients. One this service could not have issued has
    /// no record and never will, so it reads as still processing.
    pub async fn poll_key(&self, key: &str) -> Result<PollOutcome, CoreError> {
        match key.parse::<JobId>() {
            Ok(job_id) => self.poll(job_id).await,
            Err(_) => Ok(PollOutcome::Processing),
        }
    }

    /// [`subscribe`](Self::subscribe) by the id exactly as a client sent it.
    ///
    /// An id this service could not have issued gets a subscription that
    /// holds no registry entry and ends at its deadline without an event.
    pub async fn subscribe_key(
        &self,
        key: &str,
        timeout: Option<Duration>,
    ) -> Result<LiveSubscription, CoreError> {
        match key.parse::<JobId>() {
            Ok(job_id) => self.subscribe(job_id, timeout).await,
            Err(_) => {
                tracing::debug!(key, "Subscription for unknown id format");
                Ok(LiveSubscription::Pending(PendingSubscription {
                    slot: None,
                    deadline: self.deadline_for(timeout),
                    registry: Arc::clone(&self.registry),
                    shutdown: self.shutdown.clone(),
                }))
            }
        }
    }

    fn deadline_for(&self, timeout: Option<Duration>) -> Instant {
        let wait = timeout.map_or(self.max_wait, |t| t.min(self.max_wait));
        Instant::now() + wait
    }

    /// Start a live subscription for `job_id`.
    ///
    /// `timeout` is clamped to the configured maximum; `None` means the
    /// maximum.
    pub async fn subscribe(
        &self,
        job_id: JobId,
        timeout: Option<Duration>,
    ) -> Result<LiveSubscription, CoreError> {
        if let Some(raw) = self.store.get(job_id).await? {
            tracing::debug!(job_id = %job_id, "Result already stored, skipping registration");
            return Ok(LiveSubscription::Ready(PollOutcome::from_stored(job_id, Some(&raw))));
        }

        let deadline = self.deadline_for(timeout);
        let (tx, rx) = oneshot::channel();
        let registration = self.registry.register(job_id, tx, deadline);

        let pending = PendingSubscription {
            slot: Some(Slot {
                job_id,
                token: registration.token,
                rx,
            }),
            deadline,
            registry: Arc::clone(&self.registry),
            shutdown: self.shutdown.clone(),
        };

        // On error `pending` is dropped here, which deregisters it.
        if let Some(raw) = self.store.get(job_id).await? {
            if self.registry.remove_if(job_id, registration.token).is_some() {
                tracing::debug!(job_id = %job_id, "Result landed during registration");
                return Ok(LiveSubscription::Ready(PollOutcome::from_stored(job_id, Some(&raw))));
            }
            // Already taken by the listener (or replaced); the channel
            // carries the outcome.
        }

        Ok(LiveSubscription::Pending(pending))
    }

    fn deliver(registry: &SubscriptionRegistry, job_id: JobId, raw: String) {
        match registry.take(job_id) {
            Some(sub) => {
                let token = sub.token;
                if sub.deliver(Delivery::Result(raw)) {
                    tracing::info!(job_id = %job_id, token, "Result delivered to subscriber");
                } else {
                    tracing::debug!(job_id = %job_id, token, "Subscriber left before delivery");
                }
            }
            None => {
                tracing::debug!(job_id = %job_id, "No subscriber for completion");
            }
        }
    }
}

impl CompletionHandler for DeliveryCoordinator {
    fn on_completion(&self, event: CompletionEvent) {
        let job_id = event.job_id;

        if let Some(raw) = event.result {
            Self::deliver(&self.registry, job_id, raw);
            return;
        }

        // Announcement without an inline result: fetch it off the listener
        // task, but only if someone is waiting.
        if !self.registry.contains(job_id) {
            tracing::debug!(job_id = %job_id, "No subscriber for completion");
            return;
        }

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            match store.get(job_id).await {
                Ok(Some(raw)) => Self::deliver(&registry, job_id, raw),
                Ok(None) => {
                    tracing::warn!(job_id = %job_id, "Completion announced but no result stored");
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Failed to read announced result");
                }
            }
        });
    }
}
