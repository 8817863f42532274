//! Graceful shutdown sequencing.
//!
//! `axum::serve` stops accepting connections when its shutdown future
//! resolves, then waits for in-flight requests. Open SSE streams are
//! in-flight requests, so live subscriptions must be closed at that
//! moment or the drain would last until their deadlines.

use std::future::Future;
use std::sync::Arc;

use crate::delivery::DeliveryCoordinator;

/// Resolve once `signal` fires, closing live subscriptions first.
///
/// Pass the result to `with_graceful_shutdown`.
pub async fn graceful<F>(signal: F, coordinator: Arc<DeliveryCoordinator>)
where
    F: Future<Output = ()>,
{
    signal.await;
    coordinator.close_subscriptions();
}
