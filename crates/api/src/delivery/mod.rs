//! Job submission and live result delivery.
//!
//! - [`submitter`]: dispatches new jobs to the work queue.
//! - [`registry`]: per-job table of waiting subscribers.
//! - [`coordinator`]: resolves the race between a subscriber arriving
//!   and the job's completion announcement.

pub mod coordinator;
pub mod registry;
pub mod submitter;

pub use coordinator::{DeliveryCoordinator, LiveSubscription, PendingSubscription, WaitOutcome};
pub use registry::{Delivery, SubscriptionRegistry};
pub use submitter::JobSubmitter;
