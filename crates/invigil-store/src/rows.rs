//! Database row shapes and their conversion into domain records.

use chrono::{DateTime, NaiveDate, Utc};
use invigil_core::actor::AssigneeRole;
use invigil_core::error::DomainError;
use invigil_core::repository::{
    Assignee, AssignmentChange, AssignmentLogEntry, StoredEvent, UserRecord,
};
use invigil_core::ticket::{Severity, TicketRecord, TicketStatus};
use uuid::Uuid;

use crate::error::corrupt_row;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TicketRow {
    id: Uuid,
    ticket_number: String,
    category: String,
    severity: String,
    description: String,
    city: String,
    centre_code: String,
    resource_id: Option<String>,
    exam_date: Option<NaiveDate>,
    submitted_by: Option<String>,
    is_anonymous: bool,
    status: String,
    submitted_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    dependency_since: Option<DateTime<Utc>>,
    reopen_count: i32,
    resolution_note: Option<String>,
    sla_target_hours: i32,
    is_sla_breached: bool,
    resolution_time_hours: Option<f64>,
    is_deleted: bool,
}

impl TryFrom<TicketRow> for TicketRecord {
    type Error = DomainError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status: TicketStatus = row
            .status
            .parse()
            .map_err(|e: String| corrupt_row("tickets", &e))?;
        Ok(Self {
            id: row.id,
            ticket_number: row.ticket_number,
            category: row.category,
            severity: Severity::parse_lenient(&row.severity),
            description: row.description,
            city: row.city,
            centre_code: row.centre_code,
            resource_id: row.resource_id,
            exam_date: row.exam_date,
            submitted_by: row.submitted_by,
            is_anonymous: row.is_anonymous,
            status,
            submitted_at: row.submitted_at,
            last_activity_at: row.last_activity_at,
            resolved_at: row.resolved_at,
            dependency_since: row.dependency_since,
            reopen_count: row.reopen_count,
            resolution_note: row.resolution_note,
            sla_target_hours: row.sla_target_hours,
            is_sla_breached: row.is_sla_breached,
            resolution_time_hours: row.resolution_time_hours,
            is_deleted: row.is_deleted,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    event_id: Uuid,
    ticket_id: Uuid,
    action: String,
    old_value: Option<String>,
    new_value: Option<String>,
    performed_by: String,
    performed_by_role: Option<String>,
    performed_at: DateTime<Utc>,
    details: serde_json::Value,
    correlation_id: Uuid,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            ticket_id: row.ticket_id,
            action: row.action,
            old_value: row.old_value,
            new_value: row.new_value,
            performed_by: row.performed_by,
            performed_by_role: row.performed_by_role,
            performed_at: row.performed_at,
            details: row.details,
            correlation_id: row.correlation_id,
        }
    }
}

fn parse_role(table: &str, raw: &str) -> Result<AssigneeRole, DomainError> {
    raw.parse().map_err(|e: String| corrupt_row(table, &e))
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssigneeRow {
    ticket_id: Uuid,
    user_id: String,
    role: String,
    assigned_at: DateTime<Utc>,
}

impl TryFrom<AssigneeRow> for Assignee {
    type Error = DomainError;

    fn try_from(row: AssigneeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            role: parse_role("ticket_assignees", &row.role)?,
            assigned_at: row.assigned_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AssignmentLogRow {
    id: Uuid,
    ticket_id: Uuid,
    user_id: String,
    role: String,
    change: String,
    performed_by: String,
    performed_at: DateTime<Utc>,
}

impl TryFrom<AssignmentLogRow> for AssignmentLogEntry {
    type Error = DomainError;

    fn try_from(row: AssignmentLogRow) -> Result<Self, Self::Error> {
        let change = match row.change.as_str() {
            "assigned" => AssignmentChange::Assigned,
            "unassigned" => AssignmentChange::Unassigned,
            other => {
                return Err(corrupt_row(
                    "ticket_assignment_log",
                    &format!("unknown change '{other}'"),
                ));
            }
        };
        Ok(Self {
            id: row.id,
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            role: parse_role("ticket_assignment_log", &row.role)?,
            change,
            performed_by: row.performed_by,
            performed_at: row.performed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    id: String,
    display_name: String,
    city: Option<String>,
    is_active: bool,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            city: row.city,
            is_active: row.is_active,
        }
    }
}
