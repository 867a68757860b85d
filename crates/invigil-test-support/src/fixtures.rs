//! Record fixtures with sensible defaults.

use chrono::{DateTime, Utc};
use invigil_core::repository::StoredEvent;
use invigil_core::ticket::{Severity, TicketRecord, TicketStatus};
use uuid::Uuid;

/// A live, unassigned ticket in `status`, submitted at `submitted_at`.
///
/// Resolved tickets get `resolved_at = submitted_at` so the record honours
/// the resolved/`resolved_at` invariant; override it as needed.
#[must_use]
pub fn ticket_record(
    ticket_number: &str,
    status: TicketStatus,
    severity: Severity,
    submitted_at: DateTime<Utc>,
) -> TicketRecord {
    TicketRecord {
        id: Uuid::new_v4(),
        ticket_number: ticket_number.to_owned(),
        category: "Venue".to_owned(),
        severity,
        description: "Projector not working in hall B".to_owned(),
        city: "Pune".to_owned(),
        centre_code: "PN-014".to_owned(),
        resource_id: None,
        exam_date: None,
        submitted_by: Some("reporter-1".to_owned()),
        is_anonymous: false,
        status,
        submitted_at,
        last_activity_at: submitted_at,
        resolved_at: (status == TicketStatus::Resolved).then_some(submitted_at),
        dependency_since: status.awaits_user().then_some(submitted_at),
        reopen_count: 0,
        resolution_note: None,
        sla_target_hours: 24,
        is_sla_breached: false,
        resolution_time_hours: None,
        is_deleted: false,
    }
}

/// A stored event with the given identity fields and empty details.
#[must_use]
pub fn stored_event(
    ticket_id: Uuid,
    action: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    performed_by: &str,
    performed_at: DateTime<Utc>,
) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        ticket_id,
        action: action.to_owned(),
        old_value: old_value.map(str::to_owned),
        new_value: new_value.map(str::to_owned),
        performed_by: performed_by.to_owned(),
        performed_by_role: Some("admin".to_owned()),
        performed_at,
        details: serde_json::json!({}),
        correlation_id: Uuid::new_v4(),
    }
}
