//! Routes for the global activity feed and the live event stream.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use invigil_activity::application::query_handlers::{
    ActivityView, DEFAULT_FEED_LIMIT, FeedQuery, get_recent_activity,
};
use invigil_activity::domain::describe::describe;
use invigil_core::bus::EventEnvelope;
use invigil_core::repository::StoredEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Query string for GET /.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// One event as pushed to live subscribers. Live events are not
/// reconciled; clients re-read the feed to see bulk groups.
#[derive(Debug, Serialize)]
pub struct LiveActivity {
    /// Bus publication order.
    pub sequence: u64,
    #[serde(flatten)]
    pub event: StoredEvent,
    pub description: String,
}

impl From<EventEnvelope> for LiveActivity {
    fn from(envelope: EventEnvelope) -> Self {
        let event = envelope.event;
        let description = describe(
            &event.action,
            event.old_value.as_deref(),
            event.new_value.as_deref(),
            &event.performed_by,
            None,
        );
        Self {
            sequence: envelope.sequence,
            event,
            description,
        }
    }
}

fn to_sse(item: Result<EventEnvelope, BroadcastStreamRecvError>) -> Option<Event> {
    match item {
        Ok(envelope) => {
            let id = envelope.sequence.to_string();
            Event::default()
                .event("activity")
                .id(id)
                .json_data(LiveActivity::from(envelope))
                .inspect_err(|error| warn!(%error, "live activity event not encodable"))
                .ok()
        }
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            warn!(skipped, "live activity subscriber lagged");
            Some(Event::default().event("lagged").data(skipped.to_string()))
        }
    }
}

/// Server-sent event stream over a bus subscription.
pub(crate) fn live_feed(
    receiver: broadcast::Receiver<EventEnvelope>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(receiver)
        .filter_map(to_sse)
        .map(Ok::<_, Infallible>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /stream
async fn stream_activity(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    live_feed(state.bus.subscribe_all())
}

/// GET /
#[instrument(skip(state, params))]
async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<ActivityView>>, ApiError> {
    let query = FeedQuery {
        since: params.since,
        limit: params.limit.unwrap_or(DEFAULT_FEED_LIMIT),
    };
    let entries = get_recent_activity(
        query,
        &state.reconcile_policy,
        state.tickets.as_ref(),
        state.events.as_ref(),
    )
    .await?;
    Ok(Json(entries))
}

/// Returns the router for the activity feed.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(recent_activity))
        .route("/stream", get(stream_activity))
}
