use std::sync::Arc;

use review_core::store::ResultStore;

use crate::backends::Backends;
use crate::config::ServerConfig;
use crate::delivery::{DeliveryCoordinator, JobSubmitter, SubscriptionRegistry};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Result store, read by the poll and debug endpoints.
    pub store: Arc<dyn ResultStore>,
    /// Dispatches new jobs to the work queue.
    pub submitter: Arc<JobSubmitter>,
    /// Live-subscribe and completion delivery.
    pub coordinator: Arc<DeliveryCoordinator>,
}

impl AppState {
    /// Wire the delivery services on top of the chosen backends.
    pub fn new(config: ServerConfig, backends: &Backends) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let coordinator = DeliveryCoordinator::new(
            Arc::clone(&backends.store),
            registry,
            config.subscribe_timeout(),
        );

        Self {
            config: Arc::new(config),
            store: Arc::clone(&backends.store),
            submitter: Arc::new(JobSubmitter::new(Arc::clone(&backends.queue))),
            coordinator: Arc::new(coordinator),
        }
    }
}
