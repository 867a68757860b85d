//! The ticket aggregate.

use invigil_core::actor::{Actor, ActorRole};
use invigil_core::aggregate::AggregateRoot;
use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::event::EventMetadata;
use invigil_core::ticket::{TicketRecord, TicketStatus};
use uuid::Uuid;

use super::commands::NewTicket;
use super::events::{
    SlaBreached, StatusChanged, SweepKind, TicketAutoResolved, TicketCreated, TicketDeleted,
    TicketEvent, TicketEventKind,
};
use super::sla;
use super::status::{check_transition, cleared_dependencies, is_reopen};

/// The aggregate root for a ticket.
///
/// Wraps the persisted row; every mutation produces one [`TicketEvent`],
/// folds it into the row via [`AggregateRoot::apply`] and queues it for the
/// activity log.
#[derive(Debug)]
pub struct Ticket {
    record: TicketRecord,
    uncommitted_events: Vec<TicketEvent>,
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

impl Ticket {
    /// Wraps a loaded row.
    #[must_use]
    pub fn from_record(record: TicketRecord) -> Self {
        Self {
            record,
            uncommitted_events: Vec::new(),
        }
    }

    /// Current row state, including uncommitted changes.
    #[must_use]
    pub fn record(&self) -> &TicketRecord {
        &self.record
    }

    /// Consumes the aggregate, returning the row.
    #[must_use]
    pub fn into_record(self) -> TicketRecord {
        self.record
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TicketStatus {
        self.record.status
    }

    fn record_event(&mut self, metadata: EventMetadata, kind: TicketEventKind) {
        let event = TicketEvent { metadata, kind };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// Submits a new ticket in `open`, producing a `created` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if category, description, city or
    /// centre code is blank.
    pub fn submit(
        id: Uuid,
        ticket_number: String,
        new_ticket: NewTicket,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        require_text("category", &new_ticket.category)?;
        require_text("description", &new_ticket.description)?;
        require_text("city", &new_ticket.city)?;
        require_text("centre_code", &new_ticket.centre_code)?;

        let now = clock.now();
        let sla_target_hours = sla::target_hours(new_ticket.severity);
        let is_anonymous = new_ticket.submitted_by.is_none();
        let mut ticket = Self::from_record(TicketRecord {
            id,
            ticket_number: ticket_number.clone(),
            category: new_ticket.category.trim().to_owned(),
            severity: new_ticket.severity,
            description: new_ticket.description.trim().to_owned(),
            city: new_ticket.city.trim().to_owned(),
            centre_code: new_ticket.centre_code.trim().to_owned(),
            resource_id: new_ticket.resource_id,
            exam_date: new_ticket.exam_date,
            submitted_by: new_ticket.submitted_by,
            is_anonymous,
            status: TicketStatus::Open,
            submitted_at: now,
            last_activity_at: now,
            resolved_at: None,
            dependency_since: None,
            reopen_count: 0,
            resolution_note: None,
            sla_target_hours,
            is_sla_breached: false,
            resolution_time_hours: None,
            is_deleted: false,
        });

        let kind = TicketEventKind::Created(TicketCreated {
            ticket_number,
            category: ticket.record.category.clone(),
            severity: ticket.record.severity,
            city: ticket.record.city.clone(),
            centre_code: ticket.record.centre_code.clone(),
            exam_date: ticket.record.exam_date,
            is_anonymous,
            sla_target_hours,
        });
        ticket.record_event(EventMetadata::new(id, actor, correlation_id, now), kind);
        Ok(ticket)
    }

    /// Moves the ticket to `to`, producing a `status_changed` event and
    /// recomputing SLA breach. Moving to `open` is a reopen and bumps the
    /// reopen count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the transition is not
    /// permitted for the actor's role, or `DomainError::NotFound` if the
    /// ticket has been deleted.
    pub fn transition_status(
        &mut self,
        to: TicketStatus,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.record.is_deleted {
            return Err(DomainError::no_such_ticket(self.record.id));
        }
        let from = self.record.status;
        check_transition(from, to, actor.role)?;

        let now = clock.now();
        let resolved_at = (to == TicketStatus::Resolved).then_some(now);
        let kind = TicketEventKind::StatusChanged(StatusChanged {
            from,
            to,
            cleared_dependencies: cleared_dependencies(from, to),
            reopen_count: is_reopen(from, to).then_some(self.record.reopen_count + 1),
            is_sla_breached: sla::is_breached(
                to,
                self.record.submitted_at,
                resolved_at,
                self.record.sla_target_hours,
                now,
            ),
            resolution_time_hours: resolved_at
                .map(|at| sla::resolution_time_hours(self.record.submitted_at, at)),
        });
        self.record_event(
            EventMetadata::new(self.record.id, actor, correlation_id, now),
            kind,
        );
        Ok(())
    }

    /// Reopens the ticket back to `open`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` if the ticket is already
    /// `open` or is `resolved`.
    pub fn reopen(
        &mut self,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.transition_status(TicketStatus::Open, actor, correlation_id, clock)
    }

    /// Soft-deletes the ticket.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the ticket is already deleted.
    pub fn soft_delete(
        &mut self,
        actor: &Actor,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.record.is_deleted {
            return Err(DomainError::no_such_ticket(self.record.id));
        }
        let kind = TicketEventKind::Deleted(TicketDeleted {
            status: self.record.status,
        });
        self.record_event(
            EventMetadata::new(self.record.id, actor, correlation_id, clock.now()),
            kind,
        );
        Ok(())
    }

    /// Closes a ticket stuck in `user_dependency` on the system's behalf,
    /// producing a `resolved` event authored by `system`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidTransition` unless the ticket is in
    /// `user_dependency`.
    pub fn force_resolve(
        &mut self,
        sweep: SweepKind,
        triggered_by: &str,
        note: String,
        days_in_dependency: i64,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        check_transition(self.record.status, TicketStatus::Resolved, ActorRole::System)?;

        let now = clock.now();
        let kind = TicketEventKind::AutoResolved(TicketAutoResolved {
            sweep,
            triggered_by: triggered_by.to_owned(),
            note,
            days_in_dependency,
            is_sla_breached: sla::is_breached(
                TicketStatus::Resolved,
                self.record.submitted_at,
                Some(now),
                self.record.sla_target_hours,
                now,
            ),
            resolution_time_hours: sla::resolution_time_hours(self.record.submitted_at, now),
        });
        self.record_event(
            EventMetadata::new(self.record.id, &Actor::system(), correlation_id, now),
            kind,
        );
        Ok(())
    }

    /// Re-evaluates SLA breach as of now. Produces an `sla_breached` event and
    /// returns `true` only when an unresolved ticket newly crossed its target.
    pub fn refresh_sla(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        let now = clock.now();
        if self.record.status.is_terminal()
            || self.record.is_sla_breached
            || !sla::record_is_breached(&self.record, now)
        {
            return false;
        }
        let kind = TicketEventKind::SlaBreached(SlaBreached {
            sla_target_hours: self.record.sla_target_hours,
        });
        self.record_event(
            EventMetadata::new(self.record.id, &Actor::system(), correlation_id, now),
            kind,
        );
        true
    }
}

impl AggregateRoot for Ticket {
    type Event = TicketEvent;

    fn aggregate_id(&self) -> Uuid {
        self.record.id
    }

    fn apply(&mut self, event: &TicketEvent) {
        let at = event.metadata.occurred_at;
        let record = &mut self.record;
        match &event.kind {
            TicketEventKind::Created(_) => {
                record.last_activity_at = at;
            }
            TicketEventKind::StatusChanged(e) => {
                record.status = e.to;
                record.last_activity_at = at;
                record.resolved_at = (e.to == TicketStatus::Resolved).then_some(at);
                // Re-entering a user-dependency state restarts the timer.
                record.dependency_since = e.to.awaits_user().then_some(at);
                if let Some(count) = e.reopen_count {
                    record.reopen_count = count;
                }
                record.is_sla_breached = e.is_sla_breached;
                record.resolution_time_hours = e.resolution_time_hours;
            }
            TicketEventKind::AutoResolved(e) => {
                record.status = TicketStatus::Resolved;
                record.last_activity_at = at;
                record.resolved_at = Some(at);
                record.dependency_since = None;
                record.resolution_note = Some(e.note.clone());
                record.is_sla_breached = e.is_sla_breached;
                record.resolution_time_hours = Some(e.resolution_time_hours);
            }
            TicketEventKind::SlaBreached(_) => {
                record.is_sla_breached = true;
            }
            TicketEventKind::Deleted(_) => {
                record.is_deleted = true;
                record.last_activity_at = at;
            }
        }
    }

    fn uncommitted_events(&self) -> &[TicketEvent] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use invigil_core::event::DomainEvent;
    use invigil_core::ticket::Severity;
    use invigil_test_support::{FixedClock, ticket_record};

    fn fixed_clock() -> FixedClock {
        FixedClock::at(2026, 1, 15, 10, 0)
    }

    fn resolver() -> Actor {
        Actor::new("res-1", ActorRole::Resolver)
    }

    fn ticket_in(status: TicketStatus, severity: Severity) -> Ticket {
        Ticket::from_record(ticket_record("TKT-000001", status, severity, fixed_clock().0))
    }

    fn new_ticket() -> NewTicket {
        NewTicket {
            category: "Venue".to_owned(),
            severity: Severity::Sev2,
            description: "Biometric device offline".to_owned(),
            city: "Nagpur".to_owned(),
            centre_code: "NG-002".to_owned(),
            resource_id: None,
            exam_date: None,
            submitted_by: None,
        }
    }

    // --- submit ---

    #[test]
    fn test_submit_opens_ticket_with_severity_target() {
        // Arrange
        let id = Uuid::new_v4();
        let clock = fixed_clock();

        // Act
        let ticket = Ticket::submit(
            id,
            "TKT-000007".to_owned(),
            new_ticket(),
            &Actor::new("desk-1", ActorRole::Admin),
            Uuid::new_v4(),
            &clock,
        )
        .unwrap();

        // Assert
        let record = ticket.record();
        assert_eq!(record.status, TicketStatus::Open);
        assert_eq!(record.sla_target_hours, 8);
        assert!(record.is_anonymous);
        assert_eq!(record.submitted_at, clock.0);
        let events = ticket.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), "created");
        assert_eq!(events[0].new_value().as_deref(), Some("open"));
        assert_eq!(events[0].metadata().ticket_id, id);
    }

    #[test]
    fn test_submit_with_blank_description_returns_validation_error() {
        let mut input = new_ticket();
        input.description = "   ".to_owned();

        let result = Ticket::submit(
            Uuid::new_v4(),
            "TKT-000008".to_owned(),
            input,
            &resolver(),
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    // --- transition_status ---

    #[test]
    fn test_transition_updates_status_and_records_event() {
        // Arrange
        let mut ticket = ticket_in(TicketStatus::Open, Severity::Sev3);
        let clock = fixed_clock().advanced_by(Duration::hours(1));

        // Act
        ticket
            .transition_status(TicketStatus::InProgress, &resolver(), Uuid::new_v4(), &clock)
            .unwrap();

        // Assert
        assert_eq!(ticket.status(), TicketStatus::InProgress);
        assert_eq!(ticket.record().last_activity_at, clock.0);
        let event = &ticket.uncommitted_events()[0];
        assert_eq!(event.action(), "status_changed");
        assert_eq!(event.old_value().as_deref(), Some("open"));
        assert_eq!(event.new_value().as_deref(), Some("in_progress"));
        assert_eq!(event.metadata().performed_by, "res-1");
    }

    #[test]
    fn test_resolving_sets_resolved_at_and_breach() {
        // Arrange
        let mut ticket = ticket_in(TicketStatus::Approved, Severity::Sev1);
        ticket.record.sla_target_hours = 4;
        let clock = fixed_clock().advanced_by(Duration::hours(5));

        // Act
        ticket
            .transition_status(TicketStatus::Resolved, &resolver(), Uuid::new_v4(), &clock)
            .unwrap();

        // Assert
        let record = ticket.record();
        assert_eq!(record.resolved_at, Some(clock.0));
        assert_eq!(record.resolution_time_hours, Some(5.0));
        assert!(record.is_sla_breached);
    }

    #[test]
    fn test_rejected_transition_leaves_ticket_untouched() {
        let mut ticket = ticket_in(TicketStatus::Resolved, Severity::Sev2);
        let before = ticket.record().clone();

        let result = ticket.transition_status(
            TicketStatus::Approved,
            &Actor::new("appr-1", ActorRole::Approver),
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
        assert_eq!(ticket.record(), &before);
        assert!(ticket.uncommitted_events().is_empty());
    }

    #[test]
    fn test_entering_user_dependency_restarts_dependency_timer() {
        // Arrange
        let mut ticket = ticket_in(TicketStatus::UserDependency, Severity::Sev3);
        let first = fixed_clock().advanced_by(Duration::hours(2));
        let second = fixed_clock().advanced_by(Duration::hours(6));

        // Act
        ticket
            .transition_status(TicketStatus::InProgress, &resolver(), Uuid::new_v4(), &first)
            .unwrap();
        let cleared = ticket.record().dependency_since;
        ticket
            .transition_status(TicketStatus::UserDependency, &resolver(), Uuid::new_v4(), &second)
            .unwrap();

        // Assert
        assert_eq!(cleared, None);
        assert_eq!(ticket.record().dependency_since, Some(second.0));
    }

    #[test]
    fn test_reopen_increments_reopen_count() {
        let mut ticket = ticket_in(TicketStatus::SendForApproval, Severity::Sev3);
        ticket.record.reopen_count = 1;

        ticket.reopen(&resolver(), Uuid::new_v4(), &fixed_clock()).unwrap();

        assert_eq!(ticket.status(), TicketStatus::Open);
        assert_eq!(ticket.record().reopen_count, 2);
        assert_eq!(ticket.uncommitted_events()[0].details()["reopen_count"], 2);
    }

    #[test]
    fn test_transition_on_deleted_ticket_returns_not_found() {
        let mut ticket = ticket_in(TicketStatus::Open, Severity::Sev3);
        ticket.record.is_deleted = true;

        let result = ticket.transition_status(
            TicketStatus::InProgress,
            &resolver(),
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    // --- soft_delete ---

    #[test]
    fn test_soft_delete_twice_returns_not_found() {
        let mut ticket = ticket_in(TicketStatus::InProgress, Severity::Sev3);
        let admin = Actor::new("admin-1", ActorRole::Admin);

        ticket.soft_delete(&admin, Uuid::new_v4(), &fixed_clock()).unwrap();
        let second = ticket.soft_delete(&admin, Uuid::new_v4(), &fixed_clock());

        assert!(ticket.record().is_deleted);
        assert_eq!(ticket.status(), TicketStatus::InProgress);
        assert!(matches!(second, Err(DomainError::NotFound { .. })));
    }

    // --- force_resolve ---

    #[test]
    fn test_force_resolve_closes_user_dependency_as_system() {
        // Arrange
        let mut ticket = ticket_in(TicketStatus::UserDependency, Severity::Sev3);
        let clock = fixed_clock().advanced_by(Duration::days(8));

        // Act
        ticket
            .force_resolve(
                SweepKind::AutoResolve,
                "schedule",
                "No response from reporter".to_owned(),
                8,
                Uuid::new_v4(),
                &clock,
            )
            .unwrap();

        // Assert
        let record = ticket.record();
        assert_eq!(record.status, TicketStatus::Resolved);
        assert_eq!(record.resolved_at, Some(clock.0));
        assert_eq!(record.dependency_since, None);
        assert_eq!(record.resolution_note.as_deref(), Some("No response from reporter"));
        assert!(record.is_sla_breached);
        let event = &ticket.uncommitted_events()[0];
        assert_eq!(event.action(), "resolved");
        assert_eq!(event.metadata().performed_by, "system");
    }

    #[test]
    fn test_force_resolve_outside_user_dependency_is_rejected() {
        let mut ticket = ticket_in(TicketStatus::InProgress, Severity::Sev3);

        let result = ticket.force_resolve(
            SweepKind::Cleanup,
            "schedule",
            "exam over".to_owned(),
            0,
            Uuid::new_v4(),
            &fixed_clock(),
        );

        assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
    }

    // --- refresh_sla ---

    #[test]
    fn test_refresh_sla_flags_newly_breached_ticket_once() {
        // Arrange
        let mut ticket = ticket_in(TicketStatus::InProgress, Severity::Sev1);
        ticket.record.sla_target_hours = 4;
        let clock = fixed_clock().advanced_by(Duration::hours(5));

        // Act
        let first = ticket.refresh_sla(Uuid::new_v4(), &clock);
        let second = ticket.refresh_sla(Uuid::new_v4(), &clock);

        // Assert
        assert!(first);
        assert!(!second);
        assert!(ticket.record().is_sla_breached);
        assert_eq!(ticket.uncommitted_events().len(), 1);
        assert_eq!(ticket.uncommitted_events()[0].action(), "sla_breached");
    }

    #[test]
    fn test_refresh_sla_within_target_is_noop() {
        let mut ticket = ticket_in(TicketStatus::InProgress, Severity::Sev3);

        let changed =
            ticket.refresh_sla(Uuid::new_v4(), &fixed_clock().advanced_by(Duration::hours(3)));

        assert!(!changed);
        assert!(ticket.uncommitted_events().is_empty());
    }
}
