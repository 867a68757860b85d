//! Repository and store abstractions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::AssigneeRole;
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::ticket::{Page, PageRequest, TicketFilter, TicketRecord, TicketStatus};

/// Stored representation of one activity event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Ticket this event belongs to.
    pub ticket_id: Uuid,
    /// Action name. Legacy rows may use alias spellings.
    pub action: String,
    /// Value before the mutation.
    pub old_value: Option<String>,
    /// Value after the mutation.
    pub new_value: Option<String>,
    /// User id of the actor, or `system`.
    pub performed_by: String,
    /// Role the actor held, when recorded.
    pub performed_by_role: Option<String>,
    /// Timestamp of the mutation.
    pub performed_at: DateTime<Utc>,
    /// Arbitrary structured details.
    pub details: serde_json::Value,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl StoredEvent {
    /// Flattens a domain event into its stored form.
    pub fn from_domain<E: DomainEvent>(event: &E) -> Self {
        let meta = event.metadata();
        Self {
            event_id: meta.event_id,
            ticket_id: meta.ticket_id,
            action: event.action().to_owned(),
            old_value: event.old_value(),
            new_value: event.new_value(),
            performed_by: meta.performed_by.clone(),
            performed_by_role: Some(meta.performed_by_role.as_str().to_owned()),
            performed_at: meta.occurred_at,
            details: event.details(),
            correlation_id: meta.correlation_id,
        }
    }
}

/// The two physical event streams.
///
/// `History` is the append-only log every mutation writes to. `Timeline` is
/// the legacy stream kept readable so historical data can be reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStream {
    History,
    Timeline,
}

/// Selection of events to load. Results are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Restrict to one ticket.
    pub ticket_id: Option<Uuid>,
    /// Only events at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum rows to return.
    pub limit: Option<u32>,
}

impl EventQuery {
    /// All events of one ticket.
    #[must_use]
    pub fn for_ticket(ticket_id: Uuid) -> Self {
        Self {
            ticket_id: Some(ticket_id),
            ..Self::default()
        }
    }
}

/// Write precondition for ticket updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGuard {
    /// Unconditional single-row update.
    LastWriteWins,
    /// Update only if the stored status still equals this value.
    ExpectStatus(TicketStatus),
}

/// A live (ticket, user, role) binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub ticket_id: Uuid,
    pub user_id: String,
    pub role: AssigneeRole,
    pub assigned_at: DateTime<Utc>,
}

/// Direction of an assignment log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentChange {
    Assigned,
    Unassigned,
}

impl AssignmentChange {
    /// Wire name of the change.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
        }
    }
}

/// One row of the append-only assignment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentLogEntry {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: String,
    pub role: AssigneeRole,
    pub change: AssignmentChange,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub display_name: String,
    pub city: Option<String>,
    pub is_active: bool,
}

/// Ticket rows: creation, lookup, filtered listing and single-row updates.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Reserve the next human-readable ticket number.
    async fn next_ticket_number(&self) -> Result<String, DomainError>;

    /// Insert a new ticket row.
    async fn insert(&self, ticket: &TicketRecord) -> Result<(), DomainError>;

    /// Load a ticket by id, including soft-deleted rows.
    async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, DomainError>;

    /// Load several tickets by id. Missing ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<TicketRecord>, DomainError>;

    /// Filtered, paginated listing, newest submitted first.
    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Page<TicketRecord>, DomainError>;

    /// Every ticket matching the filter, newest submitted first.
    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketRecord>, DomainError>;

    /// Persist the mutable fields of a ticket in a single statement.
    ///
    /// Soft-deleted rows are never updated. Returns `false` when the row is
    /// missing or deleted, or the guard did not match; nothing was written.
    async fn update(&self, ticket: &TicketRecord, guard: WriteGuard) -> Result<bool, DomainError>;
}

/// The append-only activity log plus read access to the legacy stream.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one event to the history stream.
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError>;

    /// Load events from one stream, newest first.
    async fn load(
        &self,
        stream: EventStream,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, DomainError>;
}

/// The many-to-many ticket/user relation and its history.
#[async_trait]
pub trait AssigneeRepository: Send + Sync {
    /// Insert a binding. Returns `false` if it already existed.
    async fn add(&self, assignee: &Assignee) -> Result<bool, DomainError>;

    /// Delete a binding. Returns `false` if it did not exist.
    async fn remove(
        &self,
        ticket_id: Uuid,
        user_id: &str,
        role: AssigneeRole,
    ) -> Result<bool, DomainError>;

    /// Live bindings of one ticket, oldest first.
    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Assignee>, DomainError>;

    /// Append to the assignment history.
    async fn record(&self, entry: &AssignmentLogEntry) -> Result<(), DomainError>;

    /// Full assignment history of one ticket, oldest first.
    async fn history(&self, ticket_id: Uuid) -> Result<Vec<AssignmentLogEntry>, DomainError>;
}

/// Read-only access to known users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look a user up by id.
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, DomainError>;
}
