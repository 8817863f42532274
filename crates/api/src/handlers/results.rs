//! Handlers for reading job results: one-shot poll and live subscribe.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use review_core::result::PollOutcome;
use serde::Deserialize;

use crate::delivery::{LiveSubscription, WaitOutcome};
use crate::error::AppResult;
use crate::response::ResultStatusBody;
use crate::state::AppState;

type EventStream = BoxStream<'static, Result<Event, Infallible>>;

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /api/v1/result/{id}
///
/// Ids are opaque: any value is accepted.
///
/// - 202 while no record exists (unknown, foreign and expired ids included)
/// - 200 with the body once ready, or with the worker's error message
/// - 500 if the stored record cannot be parsed
pub async fn get_result(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let outcome = state.coordinator.poll_key(&raw_id).await?;

    let status = match &outcome {
        PollOutcome::Processing => StatusCode::ACCEPTED,
        PollOutcome::Ready(_) | PollOutcome::Failed(_) => StatusCode::OK,
        PollOutcome::Malformed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Ok((status, Json(ResultStatusBody::from_outcome(outcome))).into_response())
}

// ---------------------------------------------------------------------------
// Live subscribe
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    /// Requested wait in seconds; clamped to the server maximum.
    pub timeout_secs: Option<u64>,
}

/// GET /api/v1/result/subscribe/{id}
///
/// Server-Sent Events stream carrying at most one event:
///
/// | event        | when                                         |
/// |--------------|----------------------------------------------|
/// | `result`     | the job finished successfully                |
/// | `failed`     | the worker recorded a processing error       |
/// | `error`      | a record exists but cannot be parsed         |
/// | `superseded` | a newer subscriber for the same id took over |
///
/// When the deadline passes, or the server shuts down, the stream closes
/// without an event and the client should fall back to polling. An id this
/// service never issued simply waits out the deadline.
pub async fn subscribe_result(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(params): Query<SubscribeParams>,
) -> AppResult<Sse<KeepAliveStream<EventStream>>> {
    let timeout = params.timeout_secs.map(Duration::from_secs);

    let events: EventStream = match state.coordinator.subscribe_key(&raw_id, timeout).await? {
        LiveSubscription::Ready(outcome) => {
            stream::once(async move { Ok(outcome_event(outcome)) }).boxed()
        }
        // The pending subscription lives inside the stream, so a client
        // disconnect drops it and releases the registry entry.
        LiveSubscription::Pending(pending) => stream::once(pending.wait())
            .filter_map(|outcome| async move {
                match outcome {
                    WaitOutcome::Delivered(outcome) => Some(Ok(outcome_event(outcome))),
                    WaitOutcome::Superseded => {
                        Some(Ok(Event::default().event("superseded").data("superseded")))
                    }
                    WaitOutcome::TimedOut | WaitOutcome::Closed => None,
                }
            })
            .boxed(),
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn outcome_event(outcome: PollOutcome) -> Event {
    let name = match &outcome {
        PollOutcome::Ready(_) => "result",
        PollOutcome::Failed(_) => "failed",
        PollOutcome::Malformed(_) => "error",
        PollOutcome::Processing => "processing",
    };

    let body = ResultStatusBody::from_outcome(outcome);
    match serde_json::to_string(&body) {
        Ok(data) => Event::default().event(name).data(data),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode result event");
            Event::default().event("error").data("Result format error.")
        }
    }
}
