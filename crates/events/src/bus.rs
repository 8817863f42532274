//! Completion bus contract and the in-process implementation.
//!
//! The bus is at-most-once and non-durable. Anything missed here is still
//! available from the result store.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use review_core::completion::CompletionEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Raw payloads as received from the bus, in arrival order.
pub type CompletionStream = BoxStream<'static, String>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Completion bus unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode completion event: {0}")]
    Encode(String),
}

impl From<sqlx::Error> for BusError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait CompletionBus: Send + Sync {
    /// Announce a completed job to current subscribers.
    async fn publish(&self, event: &CompletionEvent) -> Result<(), BusError>;

    /// Open a subscription. Only announcements published after this call
    /// are observed.
    async fn subscribe(&self) -> Result<CompletionStream, BusError>;
}

// ---------------------------------------------------------------------------
// LocalCompletionBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out completion bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every announcement.
///
/// ```rust
/// use review_core::completion::CompletionEvent;
/// use review_core::types::JobId;
/// use review_events::{CompletionBus, LocalCompletionBus};
///
/// # async fn example() {
/// let bus = LocalCompletionBus::default();
/// let _rx = bus.subscribe().await.unwrap();
///
/// bus.publish(&CompletionEvent::new(JobId::new(), "{}")).await.unwrap();
/// # }
/// ```
pub struct LocalCompletionBus {
    sender: broadcast::Sender<String>,
}

impl LocalCompletionBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers skip them.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an already-encoded payload. Used by tests that need to put
    /// arbitrary bytes on the bus.
    pub fn publish_raw(&self, payload: impl Into<String>) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(payload.into());
    }
}

impl Default for LocalCompletionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CompletionBus for LocalCompletionBus {
    async fn publish(&self, event: &CompletionEvent) -> Result<(), BusError> {
        let payload = event
            .to_payload()
            .map_err(|e| BusError::Encode(e.to_string()))?;
        self.publish_raw(payload);
        Ok(())
    }

    async fn subscribe(&self) -> Result<CompletionStream, BusError> {
        let stream = BroadcastStream::new(self.sender.subscribe()).filter_map(|item| async move {
            match item {
                Ok(payload) => Some(payload),
                Err(BroadcastStreamRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Completion subscriber lagged");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
