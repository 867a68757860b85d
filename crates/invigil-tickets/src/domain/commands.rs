//! Commands for the ticket lifecycle.

use chrono::NaiveDate;
use invigil_core::actor::Actor;
use invigil_core::command::Command;
use invigil_core::ticket::{Severity, TicketStatus};
use uuid::Uuid;

/// Submission fields of a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub city: String,
    pub centre_code: String,
    pub resource_id: Option<String>,
    pub exam_date: Option<NaiveDate>,
    /// `None` files the ticket anonymously.
    pub submitted_by: Option<String>,
}

/// Command to submit a new ticket.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket: NewTicket,
}

impl Command for CreateTicket {
    fn command_type(&self) -> &'static str {
        "tickets.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Command to move a ticket to another status.
#[derive(Debug, Clone)]
pub struct TransitionStatus {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_id: Uuid,
    pub to: TicketStatus,
}

impl Command for TransitionStatus {
    fn command_type(&self) -> &'static str {
        "tickets.transition_status"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Command to reopen a non-terminal ticket.
#[derive(Debug, Clone)]
pub struct ReopenTicket {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_id: Uuid,
}

impl Command for ReopenTicket {
    fn command_type(&self) -> &'static str {
        "tickets.reopen"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Command to soft-delete a ticket.
#[derive(Debug, Clone)]
pub struct SoftDeleteTicket {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub actor: Actor,
    pub ticket_id: Uuid,
}

impl Command for SoftDeleteTicket {
    fn command_type(&self) -> &'static str {
        "tickets.soft_delete"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}
