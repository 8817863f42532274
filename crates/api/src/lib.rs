//! Contract review API server library.
//!
//! Exposes config, state, error handling, routes and the delivery services
//! so integration tests and the binary entrypoint share them.

pub mod backends;
pub mod background;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod shutdown;
pub mod state;
