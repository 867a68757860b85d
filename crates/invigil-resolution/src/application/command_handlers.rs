//! Sweep handlers.
//!
//! Sweeps are idempotent and safe to run concurrently with each other: every
//! write is guarded on the status the ticket was selected under, so a ticket
//! already resolved by a parallel run is skipped without error. A failure on
//! one ticket is collected and never stops the batch; only failing to read
//! the candidate list is a hard error.

use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::notify::NotificationKind;
use invigil_core::repository::{EventStore, TicketRepository, WriteGuard};
use invigil_core::ticket::{TicketFilter, TicketRecord, TicketStatus};
use invigil_tickets::application::command_handlers::{SideEffects, commit, notify};
use invigil_tickets::domain::aggregates::Ticket;
use invigil_tickets::domain::events::SweepKind;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::commands::{RunSweep, resolution_note};
use crate::domain::policy::{SweepPolicy, exam_has_passed};

/// Outcome of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Tickets this run changed.
    pub processed_count: usize,
    /// One human-readable line per failed ticket.
    pub errors: Vec<String>,
}

impl SweepReport {
    fn failed(&mut self, ticket: &TicketRecord, error: &DomainError) {
        warn!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            %error,
            "sweep item failed"
        );
        self.errors
            .push(format!("{} ({}): {error}", ticket.ticket_number, ticket.id));
    }
}

async fn candidates(
    tickets: &dyn TicketRepository,
    filter: &TicketFilter,
) -> Result<Vec<TicketRecord>, DomainError> {
    tickets.list_all(filter).await.inspect_err(|e| {
        error!(error = %e, "sweep could not load candidate tickets");
    })
}

#[allow(clippy::too_many_arguments)]
async fn resolve_one(
    record: TicketRecord,
    sweep: SweepKind,
    days_in_dependency: i64,
    command: &RunSweep,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<bool, DomainError> {
    let selected_under = record.status;
    let mut ticket = Ticket::from_record(record);
    ticket.force_resolve(
        sweep,
        &command.triggered_by.to_string(),
        resolution_note(sweep, days_in_dependency),
        days_in_dependency,
        command.correlation_id,
        clock,
    )?;

    let guard = WriteGuard::ExpectStatus(selected_under);
    if commit(&mut ticket, guard, tickets, events, effects.bus).await?.is_none() {
        debug!(ticket_id = %ticket.record().id, "ticket changed since selection, skipped");
        return Ok(false);
    }
    notify(effects, &ticket, NotificationKind::StatusChanged).await;
    Ok(true)
}

/// Force-resolves every live `user_dependency` ticket that has spent at
/// least `policy.threshold_days` whole days in dependency.
///
/// # Errors
///
/// Returns an error only if the candidate tickets cannot be listed.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, triggered_by = %command.triggered_by)
)]
pub async fn run_auto_resolve(
    command: &RunSweep,
    policy: SweepPolicy,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<SweepReport, DomainError> {
    let now = clock.now();
    let filter = TicketFilter::with_status(TicketStatus::UserDependency);
    let selected = candidates(tickets, &filter).await?;

    let mut report = SweepReport::default();
    for record in selected {
        if !policy.is_stale(&record, now) {
            continue;
        }
        let days = policy.days_in_dependency(&record, now);
        let snapshot = record.clone();
        let outcome = resolve_one(
            record,
            SweepKind::AutoResolve,
            days,
            command,
            clock,
            tickets,
            events,
            effects,
        )
        .await;
        match outcome {
            Ok(true) => report.processed_count += 1,
            Ok(false) => {}
            Err(error) => report.failed(&snapshot, &error),
        }
    }

    info!(
        resolved = report.processed_count,
        failed = report.errors.len(),
        "auto-resolve sweep finished"
    );
    Ok(report)
}

/// Force-resolves every live `user_dependency` ticket whose exam date is
/// before today.
///
/// # Errors
///
/// Returns an error only if the candidate tickets cannot be listed.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, triggered_by = %command.triggered_by)
)]
pub async fn run_cleanup(
    command: &RunSweep,
    policy: SweepPolicy,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<SweepReport, DomainError> {
    let now = clock.now();
    let today = clock.today();
    let filter = TicketFilter::with_status(TicketStatus::UserDependency);
    let selected = candidates(tickets, &filter).await?;

    let mut report = SweepReport::default();
    for record in selected {
        if !exam_has_passed(&record, today) {
            continue;
        }
        let days = policy.days_in_dependency(&record, now);
        let snapshot = record.clone();
        let outcome = resolve_one(
            record,
            SweepKind::Cleanup,
            days,
            command,
            clock,
            tickets,
            events,
            effects,
        )
        .await;
        match outcome {
            Ok(true) => report.processed_count += 1,
            Ok(false) => {}
            Err(error) => report.failed(&snapshot, &error),
        }
    }

    info!(
        resolved = report.processed_count,
        failed = report.errors.len(),
        "cleanup sweep finished"
    );
    Ok(report)
}

/// Recomputes the SLA breach flag of every live unresolved ticket and
/// persists the ones that newly breached.
///
/// # Errors
///
/// Returns an error only if the candidate tickets cannot be listed.
#[instrument(
    skip_all,
    fields(correlation_id = %command.correlation_id, triggered_by = %command.triggered_by)
)]
pub async fn run_sla_refresh(
    command: &RunSweep,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
    events: &dyn EventStore,
    effects: SideEffects<'_>,
) -> Result<SweepReport, DomainError> {
    let filter = TicketFilter {
        statuses: TicketStatus::ALL
            .into_iter()
            .filter(|s| !s.is_terminal())
            .collect(),
        ..TicketFilter::default()
    };
    let selected = candidates(tickets, &filter).await?;

    let mut report = SweepReport::default();
    for record in selected {
        let snapshot = record.clone();
        let mut ticket = Ticket::from_record(record);
        if !ticket.refresh_sla(command.correlation_id, clock) {
            continue;
        }
        let guard = WriteGuard::ExpectStatus(snapshot.status);
        match commit(&mut ticket, guard, tickets, events, effects.bus).await {
            Ok(Some(_)) => report.processed_count += 1,
            Ok(None) => debug!(ticket_id = %snapshot.id, "ticket changed since selection, skipped"),
            Err(error) => report.failed(&snapshot, &error),
        }
    }

    info!(
        flagged = report.processed_count,
        failed = report.errors.len(),
        "sla refresh finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use invigil_core::bus::{EventBus, EventBusConfig};
    use invigil_core::notify::TrackingLinks;
    use invigil_core::repository::StoredEvent;
    use invigil_core::ticket::{Page, PageRequest, Severity};
    use invigil_test_support::{
        FailingStore, FixedClock, InMemoryStore, RecordingNotifier, ticket_record,
    };
    use uuid::Uuid;

    use super::*;
    use crate::domain::commands::TriggeredBy;

    fn fixed_clock() -> FixedClock {
        FixedClock::at(2026, 3, 10, 8, 0)
    }

    struct Harness {
        store: InMemoryStore,
        bus: EventBus,
        notifier: RecordingNotifier,
        links: TrackingLinks,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
                bus: EventBus::new(EventBusConfig::default()),
                notifier: RecordingNotifier::default(),
                links: TrackingLinks::new("https://desk.example/track"),
            }
        }

        fn effects(&self) -> SideEffects<'_> {
            SideEffects {
                bus: &self.bus,
                notifier: &self.notifier,
                links: &self.links,
            }
        }

        fn waiting(&self, number: &str, age: Duration) -> Uuid {
            let ticket = ticket_record(
                number,
                TicketStatus::UserDependency,
                Severity::Sev3,
                fixed_clock().0 - age,
            );
            let id = ticket.id;
            self.store.put_ticket(ticket);
            id
        }

        async fn auto_resolve(&self, triggered_by: TriggeredBy) -> SweepReport {
            run_auto_resolve(
                &RunSweep::new(triggered_by),
                SweepPolicy::default(),
                &fixed_clock(),
                &self.store,
                &self.store,
                self.effects(),
            )
            .await
            .unwrap()
        }
    }

    #[tokio::test]
    async fn test_auto_resolve_respects_seven_day_threshold() {
        // Arrange
        let h = Harness::new();
        let six_days = h.waiting("TKT-000001", Duration::days(6));
        let seven_days = h.waiting("TKT-000002", Duration::days(7) + Duration::hours(1));

        // Act
        let report = h.auto_resolve(TriggeredBy::Schedule).await;

        // Assert
        assert_eq!(report.processed_count, 1);
        assert!(report.errors.is_empty());
        assert_eq!(h.store.ticket(six_days).unwrap().status, TicketStatus::UserDependency);
        let resolved = h.store.ticket(seven_days).unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.resolved_at, Some(fixed_clock().0));
        assert!(resolved.resolution_note.is_some());
    }

    #[tokio::test]
    async fn test_auto_resolve_records_system_authored_event() {
        let h = Harness::new();
        let id = h.waiting("TKT-000001", Duration::days(9));

        h.auto_resolve(TriggeredBy::Manual { operator: "ops-lead".to_owned() }).await;

        let history = h.store.history();
        assert_eq!(history.len(), 1);
        let event = &history[0];
        assert_eq!(event.ticket_id, id);
        assert_eq!(event.action, "resolved");
        assert_eq!(event.performed_by, "system");
        assert_eq!(event.old_value.as_deref(), Some("user_dependency"));
        assert_eq!(event.new_value.as_deref(), Some("resolved"));
        assert_eq!(event.details["triggered_by"], "manual:ops-lead");
        assert_eq!(event.details["days_in_dependency"], 9);
        assert_eq!(h.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_scheduled_and_manual_runs_differ_only_in_trigger() {
        // Arrange
        let scheduled = Harness::new();
        scheduled.waiting("TKT-000001", Duration::days(8));
        let manual = Harness::new();
        manual.waiting("TKT-000001", Duration::days(8));

        // Act
        scheduled.auto_resolve(TriggeredBy::Schedule).await;
        manual.auto_resolve(TriggeredBy::Manual { operator: "ops".to_owned() }).await;

        // Assert
        let a = &scheduled.store.history()[0];
        let b = &manual.store.history()[0];
        assert_eq!(a.action, b.action);
        assert_eq!(a.old_value, b.old_value);
        assert_eq!(a.new_value, b.new_value);
        assert_eq!(a.performed_by, b.performed_by);
        assert_eq!(a.performed_by_role, b.performed_by_role);
        let mut a_details = a.details.clone();
        let mut b_details = b.details.clone();
        a_details["triggered_by"] = serde_json::Value::Null;
        b_details["triggered_by"] = serde_json::Value::Null;
        assert_eq!(a_details, b_details);
    }

    #[tokio::test]
    async fn test_auto_resolve_is_idempotent() {
        let h = Harness::new();
        h.waiting("TKT-000001", Duration::days(10));
        h.waiting("TKT-000002", Duration::days(8));

        let first = h.auto_resolve(TriggeredBy::Schedule).await;
        let second = h.auto_resolve(TriggeredBy::Schedule).await;

        assert_eq!(first.processed_count, 2);
        assert_eq!(second.processed_count, 0);
        assert!(second.errors.is_empty());
        assert_eq!(h.store.history().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_resolve_isolates_per_ticket_failures() {
        // Arrange
        let h = Harness::new();
        let broken = h.waiting("TKT-000001", Duration::days(10));
        let healthy = h.waiting("TKT-000002", Duration::days(10));
        h.store.fail_updates_for(broken);

        // Act
        let report = h.auto_resolve(TriggeredBy::Schedule).await;

        // Assert
        assert_eq!(report.processed_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("TKT-000001"));
        assert_eq!(h.store.ticket(healthy).unwrap().status, TicketStatus::Resolved);
        assert_eq!(h.store.ticket(broken).unwrap().status, TicketStatus::UserDependency);
        assert_eq!(h.store.history().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_resolve_fails_hard_when_listing_fails() {
        let h = Harness::new();

        let result = run_auto_resolve(
            &RunSweep::new(TriggeredBy::Schedule),
            SweepPolicy::default(),
            &fixed_clock(),
            &FailingStore,
            &h.store,
            h.effects(),
        )
        .await;

        assert!(matches!(result, Err(DomainError::DependencyUnavailable(_))));
    }

    /// Serves a fixed candidate list while writing through to the store, as
    /// if a parallel sweep resolved tickets after this one read them.
    struct StaleListing {
        inner: InMemoryStore,
        snapshot: Mutex<Vec<TicketRecord>>,
    }

    #[async_trait]
    impl TicketRepository for StaleListing {
        async fn next_ticket_number(&self) -> Result<String, DomainError> {
            self.inner.next_ticket_number().await
        }

        async fn insert(&self, ticket: &TicketRecord) -> Result<(), DomainError> {
            self.inner.insert(ticket).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<TicketRecord>, DomainError> {
            self.inner.get(id).await
        }

        async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<TicketRecord>, DomainError> {
            self.inner.get_many(ids).await
        }

        async fn list(
            &self,
            filter: &TicketFilter,
            page: PageRequest,
        ) -> Result<Page<TicketRecord>, DomainError> {
            self.inner.list(filter, page).await
        }

        async fn list_all(&self, _filter: &TicketFilter) -> Result<Vec<TicketRecord>, DomainError> {
            Ok(self.snapshot.lock().unwrap().clone())
        }

        async fn update(
            &self,
            ticket: &TicketRecord,
            guard: WriteGuard,
        ) -> Result<bool, DomainError> {
            self.inner.update(ticket, guard).await
        }
    }

    #[tokio::test]
    async fn test_ticket_resolved_by_parallel_sweep_is_silent_noop() {
        // Arrange
        let h = Harness::new();
        let id = h.waiting("TKT-000001", Duration::days(10));
        let stale = h.store.ticket(id).unwrap();
        h.auto_resolve(TriggeredBy::Schedule).await;
        let listing = StaleListing {
            inner: InMemoryStore::new(),
            snapshot: Mutex::new(vec![stale]),
        };
        listing.inner.put_ticket(h.store.ticket(id).unwrap());

        // Act
        let report = run_auto_resolve(
            &RunSweep::new(TriggeredBy::Manual { operator: "ops".to_owned() }),
            SweepPolicy::default(),
            &fixed_clock(),
            &listing,
            &listing.inner,
            h.effects(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(report.processed_count, 0);
        assert!(report.errors.is_empty());
        let appended: Vec<StoredEvent> = listing.inner.history();
        assert!(appended.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_resolves_only_past_exam_dates() {
        // Arrange
        let h = Harness::new();
        let today = fixed_clock().0.date_naive();
        let past = h.waiting("TKT-000001", Duration::days(1));
        let upcoming = h.waiting("TKT-000002", Duration::days(1));
        let undated = h.waiting("TKT-000003", Duration::days(1));
        for (id, date) in [
            (past, Some(today - Duration::days(1))),
            (upcoming, Some(today)),
            (undated, None::<NaiveDate>),
        ] {
            let mut ticket = h.store.ticket(id).unwrap();
            ticket.exam_date = date;
            h.store.put_ticket(ticket);
        }

        // Act
        let report = run_cleanup(
            &RunSweep::new(TriggeredBy::Schedule),
            SweepPolicy::default(),
            &fixed_clock(),
            &h.store,
            &h.store,
            h.effects(),
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(report.processed_count, 1);
        assert_eq!(h.store.ticket(past).unwrap().status, TicketStatus::Resolved);
        assert_eq!(h.store.ticket(upcoming).unwrap().status, TicketStatus::UserDependency);
        assert_eq!(h.store.ticket(undated).unwrap().status, TicketStatus::UserDependency);
        assert_eq!(h.store.history()[0].details["sweep"], "cleanup");
    }

    #[tokio::test]
    async fn test_sla_refresh_flags_only_newly_breached_tickets() {
        // Arrange
        let h = Harness::new();
        let mut late = ticket_record(
            "TKT-000001",
            TicketStatus::InProgress,
            Severity::Sev1,
            fixed_clock().0 - Duration::hours(5),
        );
        late.sla_target_hours = 4;
        let fresh = ticket_record(
            "TKT-000002",
            TicketStatus::InProgress,
            Severity::Sev3,
            fixed_clock().0 - Duration::hours(1),
        );
        let late_id = late.id;
        h.store.put_ticket(late);
        h.store.put_ticket(fresh);
        let command = RunSweep::new(TriggeredBy::Schedule);

        // Act
        let first = run_sla_refresh(&command, &fixed_clock(), &h.store, &h.store, h.effects())
            .await
            .unwrap();
        let second = run_sla_refresh(&command, &fixed_clock(), &h.store, &h.store, h.effects())
            .await
            .unwrap();

        // Assert
        assert_eq!(first.processed_count, 1);
        assert_eq!(second.processed_count, 0);
        assert!(h.store.ticket(late_id).unwrap().is_sla_breached);
        let history = h.store.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "sla_breached");
    }
}
