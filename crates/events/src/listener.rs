//! Long-lived completion bus consumer.
//!
//! [`CompletionListener`] drains a [`CompletionStream`], decodes each
//! payload and passes it to a [`CompletionHandler`]. It runs as a single
//! background task and stops when the stream ends or the cancellation
//! token fires.

use std::sync::Arc;

use futures::StreamExt;
use review_core::completion::CompletionEvent;
use tokio_util::sync::CancellationToken;

use crate::bus::CompletionStream;

/// Receiver of decoded completion announcements.
///
/// Invoked on the listener task: implementations must return quickly and
/// must not perform I/O. Slow work belongs in a spawned task.
pub trait CompletionHandler: Send + Sync {
    fn on_completion(&self, event: CompletionEvent);
}

/// Background service that feeds completion announcements to a handler.
pub struct CompletionListener;

impl CompletionListener {
    /// Run the listener loop until `cancel` fires or the bus closes.
    pub async fn run(
        mut stream: CompletionStream,
        handler: Arc<dyn CompletionHandler>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Completion listener started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Completion listener stopping");
                    break;
                }
                next = stream.next() => match next {
                    Some(payload) => Self::dispatch(handler.as_ref(), &payload),
                    None => {
                        tracing::info!("Completion bus closed, listener shutting down");
                        break;
                    }
                },
            }
        }
    }

    fn dispatch(handler: &dyn CompletionHandler, payload: &str) {
        match CompletionEvent::parse(payload) {
            Ok(event) => {
                tracing::debug!(
                    job_id = %event.job_id,
                    inline = event.result.is_some(),
                    "Completion received"
                );
                handler.on_completion(event);
            }
            Err(e) => {
                tracing::error!(error = %e, "Discarding malformed completion event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use review_core::types::JobId;

    use super::*;
    use crate::bus::{CompletionBus, LocalCompletionBus};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<CompletionEvent>>,
    }

    impl CompletionHandler for Recorder {
        fn on_completion(&self, event: CompletionEvent) {
            self.seen.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn forwards_events_and_skips_garbage() {
        let bus = LocalCompletionBus::default();
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();

        let stream = bus.subscribe().await.unwrap();
        let handle = tokio::spawn(CompletionListener::run(
            stream,
            recorder.clone(),
            cancel.clone(),
        ));

        let id = JobId::new();
        bus.publish_raw("not json at all");
        bus.publish(&CompletionEvent::new(id, "r")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while recorder.seen.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("event should arrive");

        cancel.cancel();
        handle.await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].job_id, id);
    }

    #[tokio::test]
    async fn stops_when_bus_is_dropped() {
        let bus = LocalCompletionBus::default();
        let stream = bus.subscribe().await.unwrap();
        drop(bus);

        tokio::time::timeout(
            Duration::from_secs(2),
            CompletionListener::run(
                stream,
                Arc::new(Recorder::default()),
                CancellationToken::new(),
            ),
        )
        .await
        .expect("listener should exit on a closed bus");
    }
}
