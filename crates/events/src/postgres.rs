//! Completion bus over PostgreSQL `LISTEN`/`NOTIFY`.
//!
//! `NOTIFY` payloads are limited to 8000 bytes. Announcements whose inline
//! result would not fit are sent without it; receivers then read the
//! result store.

use async_trait::async_trait;
use futures::StreamExt;
use review_core::completion::CompletionEvent;
use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::bus::{BusError, CompletionBus, CompletionStream};

/// Largest payload PostgreSQL accepts for `NOTIFY` (exclusive).
const MAX_NOTIFY_PAYLOAD: usize = 8000;

pub struct PgCompletionBus {
    pool: PgPool,
    channel: String,
}

impl PgCompletionBus {
    pub fn new(pool: PgPool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Encode `event`, dropping the inline result if it would not fit.
fn encode_for_notify(event: &CompletionEvent) -> Result<String, BusError> {
    let payload = event
        .to_payload()
        .map_err(|e| BusError::Encode(e.to_string()))?;
    if payload.len() < MAX_NOTIFY_PAYLOAD {
        return Ok(payload);
    }

    tracing::debug!(
        job_id = %event.job_id,
        bytes = payload.len(),
        "Completion payload too large for NOTIFY, sending id only"
    );
    event
        .without_result()
        .to_payload()
        .map_err(|e| BusError::Encode(e.to_string()))
}

#[async_trait]
impl CompletionBus for PgCompletionBus {
    async fn publish(&self, event: &CompletionEvent) -> Result<(), BusError> {
        let payload = encode_for_notify(event)?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&self.channel)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<CompletionStream, BusError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.channel).await?;
        tracing::info!(channel = %self.channel, "Listening for completion notifications");

        let stream = listener.into_stream().filter_map(|item| async move {
            match item {
                Ok(notification) => Some(notification.payload().to_string()),
                Err(e) => {
                    tracing::warn!(error = %e, "Completion listener connection error");
                    None
                }
            }
        });
        Ok(stream.boxed())
    }
}
