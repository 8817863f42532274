//! Completion bus and listener.
//!
//! Workers announce finished jobs on the completion bus; the API process
//! subscribes once at startup and hands each announcement to a
//! [`CompletionHandler`].
//!
//! - [`CompletionBus`]: publish/subscribe contract.
//! - [`LocalCompletionBus`]: in-process bus backed by
//!   `tokio::sync::broadcast`.
//! - [`PgCompletionBus`]: PostgreSQL `LISTEN`/`NOTIFY` bus.
//! - [`CompletionListener`]: long-lived consumer task.

pub mod bus;
pub mod listener;
pub mod postgres;

pub use bus::{BusError, CompletionBus, CompletionStream, LocalCompletionBus};
pub use listener::{CompletionHandler, CompletionListener};
pub use postgres::PgCompletionBus;
