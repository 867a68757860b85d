//! Query handlers for the ticket lifecycle.

use chrono::{DateTime, Utc};
use invigil_core::actor::AssigneeRole;
use invigil_core::error::DomainError;
use invigil_core::repository::{AssigneeRepository, TicketRepository};
use invigil_core::ticket::{Page, PageRequest, TicketFilter, TicketRecord};
use serde::Serialize;
use uuid::Uuid;

/// One live assignee of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeView {
    pub user_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// A ticket with its live assignees split by role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: TicketRecord,
    pub resolvers: Vec<AssigneeView>,
    pub approvers: Vec<AssigneeView>,
}

/// Retrieves a live ticket with its assignees.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket is unknown or soft-deleted.
pub async fn get_ticket_by_id(
    ticket_id: Uuid,
    tickets: &dyn TicketRepository,
    assignees: &dyn AssigneeRepository,
) -> Result<TicketView, DomainError> {
    let ticket = match tickets.get(ticket_id).await? {
        Some(record) if !record.is_deleted => record,
        _ => return Err(DomainError::no_such_ticket(ticket_id)),
    };

    let mut resolvers = Vec::new();
    let mut approvers = Vec::new();
    for assignee in assignees.list_for_ticket(ticket_id).await? {
        let view = AssigneeView {
            user_id: assignee.user_id,
            assigned_at: assignee.assigned_at,
        };
        match assignee.role {
            AssigneeRole::Resolver => resolvers.push(view),
            AssigneeRole::Approver => approvers.push(view),
        }
    }

    Ok(TicketView {
        ticket,
        resolvers,
        approvers,
    })
}

/// Filtered, paginated listing, newest submitted first.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the page is zero or the page size is
/// outside `1..=PageRequest::MAX_PAGE_SIZE`, or if `created_from` is after
/// `created_to`.
pub async fn list_tickets(
    filter: &TicketFilter,
    page: PageRequest,
    tickets: &dyn TicketRepository,
) -> Result<Page<TicketRecord>, DomainError> {
    if page.page == 0 {
        return Err(DomainError::Validation("page starts at 1".to_owned()));
    }
    if page.page_size == 0 || page.page_size > PageRequest::MAX_PAGE_SIZE {
        return Err(DomainError::Validation(format!(
            "page_size must be between 1 and {}",
            PageRequest::MAX_PAGE_SIZE
        )));
    }
    if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
        if from > to {
            return Err(DomainError::Validation(
                "created_from must not be after created_to".to_owned(),
            ));
        }
    }
    tickets.list(filter, page).await
}
