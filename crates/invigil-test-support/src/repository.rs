//! Test stores: in-memory and failing implementations of every store trait.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use invigil_core::actor::AssigneeRole;
use invigil_core::error::DomainError;
use invigil_core::repository::{
    Assignee, AssigneeRepository, AssignmentLogEntry, EventQuery, EventStore, EventStream,
    StoredEvent, TicketRepository, UserDirectory, UserRecord, WriteGuard,
};
use invigil_core::ticket::{Page, PageRequest, TicketFilter, TicketRecord};
use uuid::Uuid;

/// A single in-memory store implementing every repository trait, so that
/// assignee-based ticket filters can see the live assignee set.
///
/// Tickets keep insertion order; listings sort newest submitted first with
/// ties in insertion order, matching the `PostgreSQL` implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tickets: Mutex<Vec<TicketRecord>>,
    ticket_sequence: Mutex<u64>,
    history: Mutex<Vec<StoredEvent>>,
    timeline: Mutex<Vec<StoredEvent>>,
    assignees: Mutex<Vec<Assignee>>,
    assignment_log: Mutex<Vec<AssignmentLogEntry>>,
    users: Mutex<HashMap<String, UserRecord>>,
    failing_updates: Mutex<HashSet<Uuid>>,
    failing_appends: Mutex<HashSet<Uuid>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active user.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_user(self, user_id: &str) -> Self {
        self.users.lock().unwrap().insert(
            user_id.to_owned(),
            UserRecord {
                id: user_id.to_owned(),
                display_name: format!("User {user_id}"),
                city: None,
                is_active: true,
            },
        );
        self
    }

    /// Inserts or replaces a ticket row, bypassing the domain.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put_ticket(&self, ticket: TicketRecord) {
        let mut tickets = self.tickets.lock().unwrap();
        match tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket,
            None => tickets.push(ticket),
        }
    }

    /// Seeds an event directly into one stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put_event(&self, stream: EventStream, event: StoredEvent) {
        match stream {
            EventStream::History => self.history.lock().unwrap().push(event),
            EventStream::Timeline => self.timeline.lock().unwrap().push(event),
        }
    }

    /// Makes every subsequent `update` of this ticket fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_updates_for(&self, ticket_id: Uuid) {
        self.failing_updates.lock().unwrap().insert(ticket_id);
    }

    /// Makes every subsequent `append` for this ticket fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_appends_for(&self, ticket_id: Uuid) {
        self.failing_appends.lock().unwrap().insert(ticket_id);
    }

    /// Snapshot of one ticket row.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn ticket(&self, id: Uuid) -> Option<TicketRecord> {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Snapshot of the history stream in append order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn history(&self) -> Vec<StoredEvent> {
        self.history.lock().unwrap().clone()
    }

    /// Snapshot of the live assignee set.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn assignees(&self) -> Vec<Assignee> {
        self.assignees.lock().unwrap().clone()
    }

    /// Snapshot of the assignment history.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn assignment_log(&self) -> Vec<AssignmentLogEntry> {
        self.assignment_log.lock().unwrap().clone()
    }

    fn matches(&self, ticket: &TicketRecord, filter: &TicketFilter, terms: &[String]) -> bool {
        let assigned_as = |role: AssigneeRole, ids: &[String]| {
            ids.is_empty()
                || self.assignees.lock().unwrap().iter().any(|a| {
                    a.ticket_id == ticket.id && a.role == role && ids.contains(&a.user_id)
                })
        };
        let in_set = |value: &str, set: &[String]| {
            set.is_empty() || set.iter().any(|s| s.eq_ignore_ascii_case(value))
        };

        (filter.include_deleted || !ticket.is_deleted)
            && (filter.statuses.is_empty() || filter.statuses.contains(&ticket.status))
            && (filter.severities.is_empty() || filter.severities.contains(&ticket.severity))
            && in_set(&ticket.category, &filter.categories)
            && in_set(&ticket.city, &filter.cities)
            && (filter.resource_ids.is_empty()
                || ticket
                    .resource_id
                    .as_ref()
                    .is_some_and(|r| filter.resource_ids.contains(r)))
            && filter.created_from.is_none_or(|from| ticket.submitted_at >= from)
            && filter.created_to.is_none_or(|to| ticket.submitted_at <= to)
            && ticket.matches_search(terms)
            && assigned_as(AssigneeRole::Resolver, &filter.resolver_ids)
            && assigned_as(AssigneeRole::Approver, &filter.approver_ids)
    }

    fn filtered(&self, filter: &TicketFilter) -> Vec<TicketRecord> {
        let terms = filter.search_terms();
        let snapshot = self.tickets.lock().unwrap().clone();
        let mut rows: Vec<TicketRecord> = snapshot
            .into_iter()
            .filter(|t| self.matches(t, filter, &terms))
            .collect();
        rows.sort_by_key(|t| Reverse(t.submitted_at));
        rows
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn next_ticket_number(&self) -> Result<String, DomainError> {
        let mut sequence = self.ticket_sequence.lock().unwrap();
        *sequence += 1;
        Ok(format!("TKT-{:06}", *sequence))
    }

    async fn insert(&self, ticket: &TicketRecord) -> Result<(), DomainError> {
        let mut tickets = self.tickets.lock().unwrap();
        if tickets.iter().any(|t| t.id == ticket.id) {
            return Err(DomainError::Validation(format!(
                "ticket {} already exists",
                ticket.id
            )));
        }
        tickets.push(ticket.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, DomainError> {
        Ok(self.ticket(id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<TicketRecord>, DomainError> {
        let tickets = self.tickets.lock().unwrap();
        Ok(tickets
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Page<TicketRecord>, DomainError> {
        let rows = self.filtered(filter);
        let total = rows.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = rows
            .into_iter()
            .skip(offset)
            .take(page.page_size as usize)
            .collect();
        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn list_all(&self, filter: &TicketFilter) -> Result<Vec<TicketRecord>, DomainError> {
        Ok(self.filtered(filter))
    }

    async fn update(&self, ticket: &TicketRecord, guard: WriteGuard) -> Result<bool, DomainError> {
        if self.failing_updates.lock().unwrap().contains(&ticket.id) {
            return Err(DomainError::DependencyUnavailable(format!(
                "update of ticket {} timed out",
                ticket.id
            )));
        }
        let mut tickets = self.tickets.lock().unwrap();
        // Soft-deleted rows are never written again.
        let Some(existing) = tickets
            .iter_mut()
            .find(|t| t.id == ticket.id && !t.is_deleted)
        else {
            return Ok(false);
        };
        if let WriteGuard::ExpectStatus(expected) = guard {
            if existing.status != expected {
                return Ok(false);
            }
        }
        *existing = ticket.clone();
        Ok(true)
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append(&self, event: &StoredEvent) -> Result<(), DomainError> {
        if self.failing_appends.lock().unwrap().contains(&event.ticket_id) {
            return Err(DomainError::DependencyUnavailable(
                "event log unavailable".into(),
            ));
        }
        self.history.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn load(
        &self,
        stream: EventStream,
        query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let source = match stream {
            EventStream::History => self.history.lock().unwrap().clone(),
            EventStream::Timeline => self.timeline.lock().unwrap().clone(),
        };
        // Newest first; reversing before the stable sort keeps later appends
        // ahead of earlier ones at equal timestamps.
        let mut events: Vec<StoredEvent> = source
            .into_iter()
            .rev()
            .filter(|e| query.ticket_id.is_none_or(|id| e.ticket_id == id))
            .filter(|e| query.since.is_none_or(|since| e.performed_at >= since))
            .collect();
        events.sort_by_key(|e| Reverse(e.performed_at));
        if let Some(limit) = query.limit {
            events.truncate(limit as usize);
        }
        Ok(events)
    }
}

#[async_trait]
impl AssigneeRepository for InMemoryStore {
    async fn add(&self, assignee: &Assignee) -> Result<bool, DomainError> {
        let mut assignees = self.assignees.lock().unwrap();
        let exists = assignees.iter().any(|a| {
            a.ticket_id == assignee.ticket_id
                && a.user_id == assignee.user_id
                && a.role == assignee.role
        });
        if !exists {
            assignees.push(assignee.clone());
        }
        Ok(!exists)
    }

    async fn remove(
        &self,
        ticket_id: Uuid,
        user_id: &str,
        role: AssigneeRole,
    ) -> Result<bool, DomainError> {
        let mut assignees = self.assignees.lock().unwrap();
        let before = assignees.len();
        assignees.retain(|a| !(a.ticket_id == ticket_id && a.user_id == user_id && a.role == role));
        Ok(assignees.len() != before)
    }

    async fn list_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<Assignee>, DomainError> {
        Ok(self
            .assignees
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn record(&self, entry: &AssignmentLogEntry) -> Result<(), DomainError> {
        self.assignment_log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn history(&self, ticket_id: Uuid) -> Result<Vec<AssignmentLogEntry>, DomainError> {
        Ok(self
            .assignment_log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.ticket_id == ticket_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserRecord>, DomainError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }
}

/// A store whose every operation fails as if the database were down.
#[derive(Debug)]
pub struct FailingStore;

fn unavailable() -> DomainError {
    DomainError::DependencyUnavailable("connection refused".into())
}

#[async_trait]
impl TicketRepository for FailingStore {
    async fn next_ticket_number(&self) -> Result<String, DomainError> {
        Err(unavailable())
    }

    async fn insert(&self, _ticket: &TicketRecord) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn get(&self, _id: Uuid) -> Result<Option<TicketRecord>, DomainError> {
        Err(unavailable())
    }

    async fn get_many(&self, _ids: &[Uuid]) -> Result<Vec<TicketRecord>, DomainError> {
        Err(unavailable())
    }

    async fn list(
        &self,
        _filter: &TicketFilter,
        _page: PageRequest,
    ) -> Result<Page<TicketRecord>, DomainError> {
        Err(unavailable())
    }

    async fn list_all(&self, _filter: &TicketFilter) -> Result<Vec<TicketRecord>, DomainError> {
        Err(unavailable())
    }

    async fn update(
        &self,
        _ticket: &TicketRecord,
        _guard: WriteGuard,
    ) -> Result<bool, DomainError> {
        Err(unavailable())
    }
}

#[async_trait]
impl EventStore for FailingStore {
    async fn append(&self, _event: &StoredEvent) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn load(
        &self,
        _stream: EventStream,
        _query: &EventQuery,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(unavailable())
    }
}

#[async_trait]
impl AssigneeRepository for FailingStore {
    async fn add(&self, _assignee: &Assignee) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn remove(
        &self,
        _ticket_id: Uuid,
        _user_id: &str,
        _role: AssigneeRole,
    ) -> Result<bool, DomainError> {
        Err(unavailable())
    }

    async fn list_for_ticket(&self, _ticket_id: Uuid) -> Result<Vec<Assignee>, DomainError> {
        Err(unavailable())
    }

    async fn record(&self, _entry: &AssignmentLogEntry) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn history(&self, _ticket_id: Uuid) -> Result<Vec<AssignmentLogEntry>, DomainError> {
        Err(unavailable())
    }
}

#[async_trait]
impl UserDirectory for FailingStore {
    async fn find_user(&self, _user_id: &str) -> Result<Option<UserRecord>, DomainError> {
        Err(unavailable())
    }
}
