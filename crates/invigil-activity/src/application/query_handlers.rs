//! Activity feed queries.
//!
//! Both feeds read the history and timeline streams, reconcile them, and
//! attach ticket numbers and display sentences for the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use invigil_core::error::DomainError;
use invigil_core::repository::{EventQuery, EventStore, EventStream, TicketRepository};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::describe::describe_entry;
use crate::domain::entries::ActivityEntry;
use crate::domain::policy::ReconcilePolicy;
use crate::domain::reconcile::reconcile;

/// Entries returned by the global feed when the caller names no limit.
pub const DEFAULT_FEED_LIMIT: u32 = 100;
/// Largest limit the global feed accepts.
pub const MAX_FEED_LIMIT: u32 = 500;

/// A ticket an entry touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRef {
    pub id: Uuid,
    /// `None` when the ticket row could not be found.
    pub ticket_number: Option<String>,
}

/// Read-only view of one feed entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityView {
    /// Id of the event standing for this entry.
    pub event_id: Uuid,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: String,
    pub performed_by_role: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub is_bulk: bool,
    /// Events folded into this entry.
    pub count: usize,
    pub tickets: Vec<TicketRef>,
    pub description: String,
    pub details: serde_json::Value,
}

/// Global feed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedQuery {
    /// Only events at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum entries returned.
    pub limit: u32,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            since: None,
            limit: DEFAULT_FEED_LIMIT,
        }
    }
}

fn to_view(entry: &ActivityEntry, numbers: &HashMap<Uuid, String>) -> ActivityView {
    let head = entry.head();
    ActivityView {
        event_id: head.event_id,
        action: head.action.clone(),
        old_value: head.old_value.clone(),
        new_value: head.new_value.clone(),
        performed_by: head.performed_by.clone(),
        performed_by_role: head.performed_by_role.clone(),
        performed_at: head.performed_at,
        is_bulk: entry.is_bulk(),
        count: entry.count(),
        tickets: entry
            .ticket_ids()
            .into_iter()
            .map(|id| TicketRef {
                id,
                ticket_number: numbers.get(&id).cloned(),
            })
            .collect(),
        description: describe_entry(entry),
        details: head.details.clone(),
    }
}

async fn ticket_numbers(
    entries: &[ActivityEntry],
    tickets: &dyn TicketRepository,
) -> Result<HashMap<Uuid, String>, DomainError> {
    let mut ids: Vec<Uuid> = entries.iter().flat_map(ActivityEntry::ticket_ids).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(tickets
        .get_many(&ids)
        .await?
        .into_iter()
        .map(|ticket| (ticket.id, ticket.ticket_number))
        .collect())
}

async fn load_reconciled(
    query: &EventQuery,
    policy: &ReconcilePolicy,
    events: &dyn EventStore,
) -> Result<Vec<ActivityEntry>, DomainError> {
    let history = events.load(EventStream::History, query).await?;
    let timeline = events.load(EventStream::Timeline, query).await?;
    let raw = history.len() + timeline.len();
    let entries = reconcile(history, timeline, policy);
    debug!(raw, entries = entries.len(), "activity reconciled");
    Ok(entries)
}

/// Reconciles the newest `query.limit` entries across both streams.
///
/// Raw rows are loaded newest first. When a stream fills the fetch size, its
/// oldest loaded row is a horizon: an entry is settled only if its anchor
/// lies more than one bulk window plus the dedup tolerance after every
/// horizon, so no unloaded row could join or cancel it. The fetch doubles
/// until `limit` entries are settled or both streams are exhausted.
async fn load_recent(
    query: FeedQuery,
    policy: &ReconcilePolicy,
    events: &dyn EventStore,
) -> Result<Vec<ActivityEntry>, DomainError> {
    let limit = query.limit as usize;
    let margin = policy.bulk_window + policy.dedup_tolerance;
    let mut fetch = query.limit;
    loop {
        let event_query = EventQuery {
            ticket_id: None,
            since: query.since,
            limit: Some(fetch),
        };
        let history = events.load(EventStream::History, &event_query).await?;
        let timeline = events.load(EventStream::Timeline, &event_query).await?;
        let horizon = [&history, &timeline]
            .into_iter()
            .filter(|rows| rows.len() >= fetch as usize)
            .filter_map(|rows| rows.last().map(|event| event.performed_at))
            .max();
        let raw = history.len() + timeline.len();
        let mut entries = reconcile(history, timeline, policy);

        let settled = horizon.is_none_or(|horizon| {
            entries
                .iter()
                .take_while(|entry| entry.performed_at() - margin > horizon)
                .count()
                >= limit
        });
        if settled || fetch == u32::MAX {
            debug!(raw, fetch, entries = entries.len(), "recent activity reconciled");
            entries.truncate(limit);
            return Ok(entries);
        }
        fetch = fetch.saturating_mul(2);
    }
}

/// Reconciled activity of one ticket, newest first. Soft-deleted tickets
/// keep their activity readable.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket does not exist, or a store
/// error if either stream cannot be read.
#[instrument(skip(policy, tickets, events), fields(ticket_id = %ticket_id))]
pub async fn get_ticket_activity(
    ticket_id: Uuid,
    policy: &ReconcilePolicy,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
) -> Result<Vec<ActivityView>, DomainError> {
    let ticket = tickets
        .get(ticket_id)
        .await?
        .ok_or_else(|| DomainError::no_such_ticket(ticket_id))?;

    let entries = load_reconciled(&EventQuery::for_ticket(ticket_id), policy, events).await?;
    let numbers = HashMap::from([(ticket.id, ticket.ticket_number)]);
    Ok(entries.iter().map(|entry| to_view(entry, &numbers)).collect())
}

/// Reconciled activity across all tickets, newest first.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the limit is zero or above
/// [`MAX_FEED_LIMIT`], or a store error if a stream cannot be read.
#[instrument(skip(policy, tickets, events), fields(limit = query.limit))]
pub async fn get_recent_activity(
    query: FeedQuery,
    policy: &ReconcilePolicy,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
) -> Result<Vec<ActivityView>, DomainError> {
    if query.limit == 0 || query.limit > MAX_FEED_LIMIT {
        return Err(DomainError::Validation(format!(
            "limit must be between 1 and {MAX_FEED_LIMIT}"
        )));
    }

    let entries = load_recent(query, policy, events).await?;

    let numbers = ticket_numbers(&entries, tickets).await?;
    Ok(entries.iter().map(|entry| to_view(entry, &numbers)).collect())
}
