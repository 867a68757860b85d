//! The per-ticket assignment aggregate.

use invigil_core::actor::{Actor, AssigneeRole};
use invigil_core::aggregate::AggregateRoot;
use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::event::EventMetadata;
use invigil_core::repository::Assignee;
use uuid::Uuid;

use super::events::{AssignmentEvent, AssignmentEventKind, RoleAssigned, RoleUnassigned};

/// The live assignee set of one ticket.
///
/// A ticket carries any number of resolvers and approvers at once. Bindings
/// are only ever inserted or deleted, never rewritten.
#[derive(Debug)]
pub struct TicketAssignments {
    ticket_id: Uuid,
    assignees: Vec<Assignee>,
    uncommitted_events: Vec<AssignmentEvent>,
}

impl TicketAssignments {
    /// Wraps the loaded live set of a ticket.
    #[must_use]
    pub fn new(ticket_id: Uuid, assignees: Vec<Assignee>) -> Self {
        Self {
            ticket_id,
            assignees,
            uncommitted_events: Vec::new(),
        }
    }

    /// The live bindings, including uncommitted changes.
    #[must_use]
    pub fn assignees(&self) -> &[Assignee] {
        &self.assignees
    }

    /// True if `user_id` currently holds `role` on this ticket.
    #[must_use]
    pub fn holds(&self, user_id: &str, role: AssigneeRole) -> bool {
        self.assignees
            .iter()
            .any(|a| a.user_id == user_id && a.role == role)
    }

    /// Assigns `user_id` as `role`. Always produces an `assigned` event;
    /// repeating an existing binding leaves the live set unchanged.
    pub fn assign(
        &mut self,
        user_id: &str,
        role: AssigneeRole,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let event = AssignmentEvent {
            metadata: EventMetadata::new(self.ticket_id, actor, correlation_id, clock.now()),
            kind: AssignmentEventKind::Assigned(RoleAssigned {
                user_id: user_id.to_owned(),
                role,
                already_assigned: self.holds(user_id, role),
            }),
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// Removes the `user_id`/`role` binding.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the binding does not exist.
    pub fn unassign(
        &mut self,
        user_id: &str,
        role: AssigneeRole,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.holds(user_id, role) {
            return Err(DomainError::Validation(format!(
                "{user_id} is not assigned as {role} on ticket {}",
                self.ticket_id
            )));
        }
        let event = AssignmentEvent {
            metadata: EventMetadata::new(self.ticket_id, actor, correlation_id, clock.now()),
            kind: AssignmentEventKind::Unassigned(RoleUnassigned {
                user_id: user_id.to_owned(),
                role,
            }),
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
        Ok(())
    }
}

impl AggregateRoot for TicketAssignments {
    type Event = AssignmentEvent;

    fn aggregate_id(&self) -> Uuid {
        self.ticket_id
    }

    fn apply(&mut self, event: &AssignmentEvent) {
        match &event.kind {
            AssignmentEventKind::Assigned(e) => {
                if !e.already_assigned {
                    self.assignees.push(Assignee {
                        ticket_id: self.ticket_id,
                        user_id: e.user_id.clone(),
                        role: e.role,
                        assigned_at: event.metadata.occurred_at,
                    });
                }
            }
            AssignmentEventKind::Unassigned(e) => {
                self.assignees
                    .retain(|a| !(a.user_id == e.user_id && a.role == e.role));
            }
        }
    }

    fn uncommitted_events(&self) -> &[AssignmentEvent] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
