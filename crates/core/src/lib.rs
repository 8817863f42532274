//! Domain types and infrastructure contracts for asynchronous contract review.
//!
//! - [`types`]: [`JobId`](types::JobId) and shared aliases.
//! - [`job`]: the submitted document payload and its queue wire form.
//! - [`result`]: [`ResultRecord`](result::ResultRecord) and poll outcomes.
//! - [`completion`]: the completion notification carried by the bus.
//! - [`queue`] / [`store`]: the work queue and result store contracts,
//!   each with an in-memory implementation.

pub mod completion;
pub mod error;
pub mod job;
pub mod queue;
pub mod result;
pub mod store;
pub mod types;
