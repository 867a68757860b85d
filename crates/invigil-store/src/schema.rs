//! Database schema: table names and column lists shared by the stores.
//!
//! The DDL itself lives in `migrations/0001_initial_schema.sql`.

use invigil_core::repository::EventStream;

/// The initial schema, as applied by `sqlx::migrate!`.
pub const INITIAL_SCHEMA: &str = include_str!("../../../migrations/0001_initial_schema.sql");

pub const TICKETS_TABLE: &str = "tickets";
pub const ASSIGNEES_TABLE: &str = "ticket_assignees";
pub const ASSIGNMENT_LOG_TABLE: &str = "ticket_assignment_log";
pub const USERS_TABLE: &str = "users";

/// Sequence backing `TKT-000001`-style numbers.
pub const TICKET_NUMBER_SEQUENCE: &str = "ticket_number_seq";

/// Current version of the history stream's row shape.
pub const HISTORY_SCHEMA_VERSION: i32 = 1;

/// Columns selected into a ticket row, in `TicketRow` order.
pub const TICKET_COLUMNS: &str = "id, ticket_number, category, severity, description, city, \
     centre_code, resource_id, exam_date, submitted_by, is_anonymous, status, submitted_at, \
     last_activity_at, resolved_at, dependency_since, reopen_count, resolution_note, \
     sla_target_hours, is_sla_breached, resolution_time_hours, is_deleted";

/// Columns selected into an event row; shared by both streams.
pub const EVENT_COLUMNS: &str = "event_id, ticket_id, action, old_value, new_value, \
     performed_by, performed_by_role, performed_at, details, correlation_id";

/// Physical table of an event stream.
#[must_use]
pub const fn stream_table(stream: EventStream) -> &'static str {
    match stream {
        EventStream::History => "ticket_history",
        EventStream::Timeline => "ticket_timeline",
    }
}
