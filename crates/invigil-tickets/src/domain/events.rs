//! Domain events for the ticket lifecycle.

use chrono::NaiveDate;
use invigil_core::event::{DomainEvent, EventMetadata};
use invigil_core::ticket::{Severity, TicketStatus};
use serde::{Deserialize, Serialize};

use super::status::Dependency;

/// Emitted when a ticket is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCreated {
    pub ticket_number: String,
    pub category: String,
    pub severity: Severity,
    pub city: String,
    pub centre_code: String,
    pub exam_date: Option<NaiveDate>,
    pub is_anonymous: bool,
    pub sla_target_hours: i32,
}

/// Emitted on every accepted status transition, reopen included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub from: TicketStatus,
    pub to: TicketStatus,
    /// Dependency conditions this transition cleared.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleared_dependencies: Vec<Dependency>,
    /// Running reopen count, present only on reopen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopen_count: Option<i32>,
    pub is_sla_breached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time_hours: Option<f64>,
}

/// Which sweep force-resolved a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Stuck in user dependency past the day threshold.
    AutoResolve,
    /// Exam date already passed.
    Cleanup,
}

impl SweepKind {
    /// Wire name of the sweep.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoResolve => "auto_resolve",
            Self::Cleanup => "cleanup",
        }
    }
}

/// Emitted when a sweep closes a ticket on the system's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketAutoResolved {
    pub sweep: SweepKind,
    /// `schedule`, or `manual:{operator}`.
    pub triggered_by: String,
    pub note: String,
    pub days_in_dependency: i64,
    pub is_sla_breached: bool,
    pub resolution_time_hours: f64,
}

/// Emitted when the SLA refresh detects a newly breached ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaBreached {
    pub sla_target_hours: i32,
}

/// Emitted when a ticket is soft-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDeleted {
    pub status: TicketStatus,
}

/// Event payload variants for the ticket lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketEventKind {
    Created(TicketCreated),
    StatusChanged(StatusChanged),
    AutoResolved(TicketAutoResolved),
    SlaBreached(SlaBreached),
    Deleted(TicketDeleted),
}

/// Domain event envelope for the ticket lifecycle.
#[derive(Debug, Clone)]
pub struct TicketEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: TicketEventKind,
}

impl DomainEvent for TicketEvent {
    fn action(&self) -> &'static str {
        match &self.kind {
            TicketEventKind::Created(_) => "created",
            TicketEventKind::StatusChanged(_) => "status_changed",
            TicketEventKind::AutoResolved(_) => "resolved",
            TicketEventKind::SlaBreached(_) => "sla_breached",
            TicketEventKind::Deleted(_) => "deleted",
        }
    }

    fn old_value(&self) -> Option<String> {
        match &self.kind {
            TicketEventKind::Created(_) => None,
            TicketEventKind::StatusChanged(e) => Some(e.from.as_str().to_owned()),
            TicketEventKind::AutoResolved(_) => {
                Some(TicketStatus::UserDependency.as_str().to_owned())
            }
            TicketEventKind::SlaBreached(_) => Some("false".to_owned()),
            TicketEventKind::Deleted(e) => Some(e.status.as_str().to_owned()),
        }
    }

    fn new_value(&self) -> Option<String> {
        match &self.kind {
            TicketEventKind::Created(_) => Some(TicketStatus::Open.as_str().to_owned()),
            TicketEventKind::StatusChanged(e) => Some(e.to.as_str().to_owned()),
            TicketEventKind::AutoResolved(_) => Some(TicketStatus::Resolved.as_str().to_owned()),
            TicketEventKind::SlaBreached(_) => Some("true".to_owned()),
            TicketEventKind::Deleted(_) => None,
        }
    }

    fn details(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("TicketEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
