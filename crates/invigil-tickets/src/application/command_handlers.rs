//! Command handlers for the ticket lifecycle.
//!
//! Each handler loads the ticket row, runs the domain method, writes the row
//! in a single statement and only then appends the resulting activity event.

use invigil_core::aggregate::AggregateRoot;
use invigil_core::bus::EventBus;
use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::notify::{NotificationKind, Notifier, TicketNotification, TrackingLinks};
use invigil_core::repository::{EventStore, StoredEvent, TicketRepository, WriteGuard};
use invigil_core::ticket::TicketRecord;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::Ticket;
use crate::domain::commands::{CreateTicket, ReopenTicket, SoftDeleteTicket, TransitionStatus};

/// Collaborators notified after a mutation commits. None of them can fail
/// the mutation.
#[derive(Clone, Copy)]
pub struct SideEffects<'a> {
    pub bus: &'a EventBus,
    pub notifier: &'a dyn Notifier,
    pub links: &'a TrackingLinks,
}

/// Loads a ticket that has not been soft-deleted.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket is unknown or deleted.
pub async fn load_live(
    ticket_id: Uuid,
    tickets: &dyn TicketRepository,
) -> Result<Ticket, DomainError> {
    match tickets.get(ticket_id).await? {
        Some(record) if !record.is_deleted => Ok(Ticket::from_record(record)),
        _ => Err(DomainError::no_such_ticket(ticket_id)),
    }
}

/// Appends the ticket's uncommitted events to the history stream and
/// publishes each on the bus.
async fn append_uncommitted(
    ticket: &mut Ticket,
    events: &dyn EventStore,
    bus: &EventBus,
) -> Result<Vec<StoredEvent>, DomainError> {
    let stored: Vec<StoredEvent> = ticket
        .uncommitted_events()
        .iter()
        .map(StoredEvent::from_domain)
        .collect();
    for event in &stored {
        events.append(event).await?;
        bus.publish(event.clone());
    }
    ticket.clear_uncommitted_events();
    Ok(stored)
}

/// Writes the ticket row under `guard`, then appends its events.
///
/// Returns `Ok(None)` when an `ExpectStatus` guard no longer matched, in
/// which case nothing was written.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if an unguarded update touched no row,
/// or any store error.
pub async fn commit(
    ticket: &mut Ticket,
    guard: WriteGuard,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    bus: &EventBus,
) -> Result<Option<Vec<StoredEvent>>, DomainError> {
    if !tickets.update(ticket.record(), guard).await? {
        return match guard {
            WriteGuard::LastWriteWins => Err(DomainError::no_such_ticket(ticket.aggregate_id())),
            WriteGuard::ExpectStatus(_) => Ok(None),
        };
    }
    append_uncommitted(ticket, events, bus).await.map(Some)
}

/// Sends a notification about `ticket`. Delivery failures are logged only.
pub async fn notify(effects: SideEffects<'_>, ticket: &Ticket, kind: NotificationKind) {
    let record = ticket.record();
    let notification = TicketNotification {
        kind,
        ticket_id: record.id,
        ticket_number: record.ticket_number.clone(),
        category: record.category.clone(),
        description: record.description.clone(),
        status: record.status,
        tracking_link: effects.links.link_for(&record.ticket_number),
    };
    if let Err(error) = effects.notifier.notify(&notification).await {
        warn!(
            ticket_id = %record.id,
            ticket_number = %record.ticket_number,
            %error,
            "ticket notification failed"
        );
    }
}

/// Handles the `CreateTicket` command: reserves a ticket number, inserts the
/// row, appends the `created` event and notifies the reporter.
///
/// # Errors
///
/// Returns `DomainError::Validation` for blank fields, or any store error.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, actor = %command.actor.id))]
pub async fn handle_create_ticket(
    command: &CreateTicket,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<TicketRecord, DomainError> {
    let number = tickets.next_ticket_number().await?;
    let mut ticket = Ticket::submit(
        Uuid::new_v4(),
        number,
        command.ticket.clone(),
        &command.actor,
        command.correlation_id,
        clock,
    )?;

    tickets.insert(ticket.record()).await?;
    append_uncommitted(&mut ticket, events, effects.bus).await?;
    info!(
        ticket_id = %ticket.aggregate_id(),
        ticket_number = %ticket.record().ticket_number,
        severity = %ticket.record().severity,
        "ticket created"
    );

    notify(effects, &ticket, NotificationKind::TicketCreated).await;
    Ok(ticket.into_record())
}

/// Handles the `TransitionStatus` command.
///
/// Concurrent transitions on one ticket race with last-write-wins on the
/// row; each accepted transition still gets its own event.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition`, `DomainError::NotFound`, or any
/// store error.
#[instrument(
    skip_all,
    fields(ticket_id = %command.ticket_id, to = %command.to, role = %command.actor.role)
)]
pub async fn handle_transition_status(
    command: &TransitionStatus,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<TicketRecord, DomainError> {
    let mut ticket = load_live(command.ticket_id, tickets).await?;
    let from = ticket.status();
    ticket.transition_status(command.to, &command.actor, command.correlation_id, clock)?;

    commit(&mut ticket, WriteGuard::LastWriteWins, tickets, events, effects.bus).await?;
    info!(%from, "ticket status changed");

    notify(effects, &ticket, NotificationKind::StatusChanged).await;
    Ok(ticket.into_record())
}

/// Handles the `ReopenTicket` command.
///
/// # Errors
///
/// Returns `DomainError::InvalidTransition` if the ticket is `open` or
/// `resolved`, `DomainError::NotFound`, or any store error.
#[instrument(skip_all, fields(ticket_id = %command.ticket_id))]
pub async fn handle_reopen_ticket(
    command: &ReopenTicket,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<TicketRecord, DomainError> {
    let mut ticket = load_live(command.ticket_id, tickets).await?;
    ticket.reopen(&command.actor, command.correlation_id, clock)?;

    commit(&mut ticket, WriteGuard::LastWriteWins, tickets, events, effects.bus).await?;
    info!(reopen_count = ticket.record().reopen_count, "ticket reopened");

    notify(effects, &ticket, NotificationKind::StatusChanged).await;
    Ok(ticket.into_record())
}

/// Handles the `SoftDeleteTicket` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the ticket is unknown or already
/// deleted, or any store error.
#[instrument(skip_all, fields(ticket_id = %command.ticket_id))]
pub async fn handle_soft_delete_ticket(
    command: &SoftDeleteTicket,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    bus: &EventBus,
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut ticket = load_live(command.ticket_id, tickets).await?;
    ticket.soft_delete(&command.actor, command.correlation_id, clock)?;

    let stored = commit(&mut ticket, WriteGuard::LastWriteWins, tickets, events, bus)
        .await?
        .unwrap_or_default();
    info!("ticket soft-deleted");
    Ok(stored)
}
