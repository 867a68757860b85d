//! Query handlers for ticket assignment.

use invigil_core::error::DomainError;
use invigil_core::repository::{AssigneeRepository, AssignmentLogEntry, TicketRepository};
use uuid::Uuid;

/// Full assign/unassign history of a ticket, oldest first.
///
/// The history outlives the live assignee set, so soft-deleted tickets
/// still answer.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket is unknown.
pub async fn get_assignment_log(
    ticket_id: Uuid,
    tickets: &dyn TicketRepository,
    assignees: &dyn AssigneeRepository,
) -> Result<Vec<AssignmentLogEntry>, DomainError> {
    if tickets.get(ticket_id).await?.is_none() {
        return Err(DomainError::no_such_ticket(ticket_id));
    }
    assignees.history(ticket_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use invigil_core::actor::AssigneeRole;
    use invigil_core::repository::AssignmentChange;
    use invigil_core::ticket::{Severity, TicketStatus};
    use invigil_test_support::{FixedClock, InMemoryStore, ticket_record};

    #[tokio::test]
    async fn test_get_assignment_log_returns_history_oldest_first() {
        // Arrange
        let store = InMemoryStore::new();
        let clock = FixedClock::at(2026, 1, 15, 10, 0);
        let ticket = ticket_record("TKT-000001", TicketStatus::Open, Severity::Sev3, clock.0);
        let id = ticket.id;
        store.put_ticket(ticket);
        for (change, at) in [
            (AssignmentChange::Assigned, clock.0),
            (AssignmentChange::Unassigned, clock.advanced_by(chrono::Duration::hours(1)).0),
        ] {
            store
                .record(&AssignmentLogEntry {
                    id: Uuid::new_v4(),
                    ticket_id: id,
                    user_id: "res-1".to_owned(),
                    role: AssigneeRole::Resolver,
                    change,
                    performed_by: "admin-1".to_owned(),
                    performed_at: at,
                })
                .await
                .unwrap();
        }

        // Act
        let log = get_assignment_log(id, &store, &store).await.unwrap();

        // Assert
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].change, AssignmentChange::Assigned);
        assert_eq!(log[1].change, AssignmentChange::Unassigned);
    }

    #[tokio::test]
    async fn test_get_assignment_log_for_unknown_ticket_returns_not_found() {
        let store = InMemoryStore::new();

        let result = get_assignment_log(Uuid::new_v4(), &store, &store).await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
