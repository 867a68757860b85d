//! Command handlers for ticket assignment.
//!
//! Every ticket in a bulk call is handled on its own: a failure on one
//! ticket is collected into the report and never aborts the others.

use invigil_core::actor::AssigneeRole;
use invigil_core::aggregate::AggregateRoot;
use invigil_core::bus::EventBus;
use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::repository::{
    Assignee, AssigneeRepository, AssignmentChange, AssignmentLogEntry, EventStore, StoredEvent,
    TicketRepository, UserDirectory, UserRecord,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::TicketAssignments;
use crate::domain::commands::{AssignRole, AssignTeam, UnassignRole};

/// Stores an assignment command touches.
#[derive(Clone, Copy)]
pub struct AssignmentStores<'a> {
    pub tickets: &'a dyn TicketRepository,
    pub assignees: &'a dyn AssigneeRepository,
    pub users: &'a dyn UserDirectory,
    pub events: &'a dyn EventStore,
    pub bus: &'a EventBus,
}

/// Outcome for one ticket of a bulk assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketOutcome {
    pub ticket_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-ticket result list of a bulk assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    pub outcomes: Vec<TicketOutcome>,
    /// Tickets assigned successfully.
    pub processed_count: usize,
    pub errors: Vec<String>,
}

impl AssignmentReport {
    fn succeeded(&mut self, ticket_id: Uuid) {
        self.processed_count += 1;
        self.outcomes.push(TicketOutcome {
            ticket_id,
            success: true,
            error: None,
        });
    }

    fn failed(&mut self, ticket_id: Uuid, error: &DomainError) {
        self.errors.push(format!("ticket {ticket_id}: {error}"));
        self.outcomes.push(TicketOutcome {
            ticket_id,
            success: false,
            error: Some(error.to_string()),
        });
    }

    /// A report where every ticket failed for the same reason.
    fn all_failed(ticket_ids: &[Uuid], error: &DomainError) -> Self {
        let mut report = Self::default();
        for ticket_id in ticket_ids {
            report.failed(*ticket_id, error);
        }
        report
    }

    /// False only when nothing succeeded. A partial run is a qualified
    /// success: `true` with a non-empty `errors`.
    #[must_use]
    pub fn success(&self) -> bool {
        self.processed_count > 0 || self.outcomes.is_empty()
    }

    /// Number of tickets that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.processed_count
    }
}

/// Result of a combined resolver + approver assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamAssignmentReport {
    /// Both requested halves succeeded. A succeeded half is never rolled
    /// back when the other fails.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<AssignmentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver: Option<AssignmentReport>,
}

async fn require_user(users: &dyn UserDirectory, user_id: &str) -> Result<UserRecord, DomainError> {
    users
        .find_user(user_id)
        .await?
        .ok_or_else(|| DomainError::no_such_user(user_id))
}

async fn require_live_ticket(
    tickets: &dyn TicketRepository,
    ticket_id: Uuid,
) -> Result<(), DomainError> {
    match tickets.get(ticket_id).await? {
        Some(ticket) if !ticket.is_deleted => Ok(()),
        _ => Err(DomainError::no_such_ticket(ticket_id)),
    }
}

async fn append_uncommitted(
    assignments: &mut TicketAssignments,
    stores: AssignmentStores<'_>,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored: Vec<StoredEvent> = assignments
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain)
        .collect();
    for event in &stored {
        stores.events.append(event).await?;
        stores.bus.publish(event.clone());
    }
    assignments.clear_uncommitted_events();
    Ok(stored)
}

fn log_entry(
    ticket_id: Uuid,
    user_id: &str,
    role: AssigneeRole,
    change: AssignmentChange,
    performed_by: &str,
    clock: &dyn Clock,
) -> AssignmentLogEntry {
    AssignmentLogEntry {
        id: Uuid::new_v4(),
        ticket_id,
        user_id: user_id.to_owned(),
        role,
        change,
        performed_by: performed_by.to_owned(),
        performed_at: clock.now(),
    }
}

async fn assign_one(
    ticket_id: Uuid,
    command: &AssignRole,
    clock: &dyn Clock,
    stores: AssignmentStores<'_>,
) -> Result<StoredEvent, DomainError> {
    require_live_ticket(stores.tickets, ticket_id).await?;
    let current = stores.assignees.list_for_ticket(ticket_id).await?;
    let mut assignments = TicketAssignments::new(ticket_id, current);
    assignments.assign(
        &command.user_id,
        command.role,
        &command.actor,
        command.correlation_id,
        clock,
    );

    let inserted = stores
        .assignees
        .add(&Assignee {
            ticket_id,
            user_id: command.user_id.clone(),
            role: command.role,
            assigned_at: clock.now(),
        })
        .await?;
    if inserted {
        stores
            .assignees
            .record(&log_entry(
                ticket_id,
                &command.user_id,
                command.role,
                AssignmentChange::Assigned,
                &command.actor.id,
                clock,
            ))
            .await?;
    }

    let mut stored = append_uncommitted(&mut assignments, stores).await?;
    stored
        .pop()
        .ok_or_else(|| DomainError::Validation("assignment produced no event".to_owned()))
}

/// Handles the `AssignRole` command: assigns the user on every listed
/// ticket, one `assigned` event per ticket.
///
/// # Errors
///
/// Returns `DomainError::Validation` if no ticket ids are given or the user
/// is inactive, `DomainError::NotFound` if the user is unknown, or a store
/// error if the user lookup fails. Per-ticket failures are reported, not
/// returned.
#[instrument(
    skip_all,
    fields(user_id = %command.user_id, role = %command.role, tickets = command.ticket_ids.len())
)]
pub async fn handle_assign_role(
    command: &AssignRole,
    clock: &dyn Clock,
    stores: AssignmentStores<'_>,
) -> Result<AssignmentReport, DomainError> {
    if command.ticket_ids.is_empty() {
        return Err(DomainError::Validation("ticket_ids must not be empty".to_owned()));
    }
    let user = require_user(stores.users, &command.user_id).await?;
    if !user.is_active {
        return Err(DomainError::Validation(format!("user {} is inactive", user.id)));
    }

    let mut report = AssignmentReport::default();
    for &ticket_id in &command.ticket_ids {
        match assign_one(ticket_id, command, clock, stores).await {
            Ok(_) => report.succeeded(ticket_id),
            Err(error) => {
                warn!(%ticket_id, %error, "assignment failed");
                report.failed(ticket_id, &error);
            }
        }
    }

    info!(
        processed = report.processed_count,
        failed = report.failed_count(),
        "role assigned"
    );
    Ok(report)
}

/// Handles the `AssignTeam` command: runs the resolver and approver halves
/// independently and ANDs their outcomes.
///
/// # Errors
///
/// Returns `DomainError::Validation` if neither half is requested or no
/// ticket ids are given. Failures inside a half are reported in that half.
#[instrument(skip_all, fields(tickets = command.ticket_ids.len()))]
pub async fn handle_assign_team(
    command: &AssignTeam,
    clock: &dyn Clock,
    stores: AssignmentStores<'_>,
) -> Result<TeamAssignmentReport, DomainError> {
    if command.resolver_id.is_none() && command.approver_id.is_none() {
        return Err(DomainError::Validation(
            "at least one of resolver_id or approver_id is required".to_owned(),
        ));
    }
    if command.ticket_ids.is_empty() {
        return Err(DomainError::Validation("ticket_ids must not be empty".to_owned()));
    }

    let mut halves = [None, None];
    for (slot, (user_id, role)) in halves.iter_mut().zip([
        (command.resolver_id.as_deref(), AssigneeRole::Resolver),
        (command.approver_id.as_deref(), AssigneeRole::Approver),
    ]) {
        let Some(user_id) = user_id else { continue };
        let half = command.half(user_id, role);
        let report = match handle_assign_role(&half, clock, stores).await {
            Ok(report) => report,
            Err(error) => {
                warn!(%user_id, %role, %error, "team assignment half failed");
                AssignmentReport::all_failed(&command.ticket_ids, &error)
            }
        };
        *slot = Some(report);
    }
    let [resolver, approver] = halves;

    let success = [&resolver, &approver]
        .into_iter()
        .all(|half| half.as_ref().is_none_or(AssignmentReport::success));
    Ok(TeamAssignmentReport {
        success,
        resolver,
        approver,
    })
}

/// Handles the `UnassignRole` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket or user is unknown,
/// `DomainError::Validation` if the binding does not exist, or any store
/// error.
#[instrument(
    skip_all,
    fields(ticket_id = %command.ticket_id, user_id = %command.user_id, role = %command.role)
)]
pub async fn handle_unassign_role(
    command: &UnassignRole,
    clock: &dyn Clock,
    stores: AssignmentStores<'_>,
) -> Result<StoredEvent, DomainError> {
    require_live_ticket(stores.tickets, command.ticket_id).await?;
    require_user(stores.users, &command.user_id).await?;

    let current = stores.assignees.list_for_ticket(command.ticket_id).await?;
    let mut assignments = TicketAssignments::new(command.ticket_id, current);
    assignments.unassign(
        &command.user_id,
        command.role,
        &command.actor,
        command.correlation_id,
        clock,
    )?;

    let removed = stores
        .assignees
        .remove(command.ticket_id, &command.user_id, command.role)
        .await?;
    if !removed {
        return Err(DomainError::Validation(format!(
            "{} is no longer assigned as {}",
            command.user_id, command.role
        )));
    }
    stores
        .assignees
        .record(&log_entry(
            command.ticket_id,
            &command.user_id,
            command.role,
            AssignmentChange::Unassigned,
            &command.actor.id,
            clock,
        ))
        .await?;

    let mut stored = append_uncommitted(&mut assignments, stores).await?;
    info!("role unassigned");
    stored
        .pop()
        .ok_or_else(|| DomainError::Validation("unassignment produced no event".to_owned()))
}
