//! Recurring sweep schedule.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use invigil_core::bus::EventBus;
use invigil_core::clock::Clock;
use invigil_core::notify::{Notifier, TrackingLinks};
use invigil_core::repository::{EventStore, TicketRepository};
use invigil_tickets::application::command_handlers::SideEffects;
use tracing::{error, info, warn};

use super::command_handlers::{SweepReport, run_auto_resolve, run_cleanup, run_sla_refresh};
use crate::domain::commands::{RunSweep, TriggeredBy};
use crate::domain::policy::SweepPolicy;

/// Everything a sweep run needs, shareable across tasks.
pub struct SweepRuntime {
    pub clock: Arc<dyn Clock>,
    pub tickets: Arc<dyn TicketRepository>,
    pub events: Arc<dyn EventStore>,
    pub bus: Arc<EventBus>,
    pub notifier: Arc<dyn Notifier>,
    pub links: TrackingLinks,
    pub policy: SweepPolicy,
}

/// Reports of one full pass. `None` marks a sweep that failed outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepPass {
    pub auto_resolve: Option<SweepReport>,
    pub cleanup: Option<SweepReport>,
    pub sla_refresh: Option<SweepReport>,
}

impl SweepRuntime {
    /// Side-effect collaborators borrowed from the runtime.
    #[must_use]
    pub fn effects(&self) -> SideEffects<'_> {
        SideEffects {
            bus: &self.bus,
            notifier: self.notifier.as_ref(),
            links: &self.links,
        }
    }

    /// Runs auto-resolve, cleanup and SLA refresh in turn. Each sweep is
    /// independent: a hard failure in one is logged and the next still runs.
    pub async fn run_pass(&self, triggered_by: TriggeredBy) -> SweepPass {
        let clock = self.clock.as_ref();
        let tickets = self.tickets.as_ref();
        let events = self.events.as_ref();

        let command = RunSweep::new(triggered_by.clone());
        let auto_resolve =
            run_auto_resolve(&command, self.policy, clock, tickets, events, self.effects())
                .await
                .inspect_err(|e| error!(error = %e, "auto-resolve sweep failed"))
                .ok();

        let command = RunSweep::new(triggered_by.clone());
        let cleanup = run_cleanup(&command, self.policy, clock, tickets, events, self.effects())
            .await
            .inspect_err(|e| error!(error = %e, "cleanup sweep failed"))
            .ok();

        let command = RunSweep::new(triggered_by);
        let sla_refresh = run_sla_refresh(&command, clock, tickets, events, self.effects())
            .await
            .inspect_err(|e| error!(error = %e, "sla refresh failed"))
            .ok();

        SweepPass {
            auto_resolve,
            cleanup,
            sla_refresh,
        }
    }
}

/// First instant of `schedule` strictly after `now`.
#[must_use]
pub fn next_run(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&now).next()
}

/// Runs a sweep pass at every instant of `schedule`. Returns only if the
/// schedule has no upcoming instant; abort the task to stop it earlier.
pub async fn run_schedule(runtime: Arc<SweepRuntime>, schedule: Schedule) {
    info!(%schedule, "sweep schedule started");
    loop {
        let now = runtime.clock.now();
        let Some(next) = next_run(&schedule, now) else {
            warn!(%schedule, "sweep schedule has no upcoming run");
            return;
        };
        info!(next_run = %next, "next sweep pass scheduled");
        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;
        runtime.run_pass(TriggeredBy::Schedule).await;
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{Duration as ChronoDuration, TimeZone};
    use invigil_core::bus::EventBusConfig;
    use invigil_core::ticket::{Severity, TicketStatus};
    use invigil_test_support::{
        FailingStore, FixedClock, InMemoryStore, RecordingNotifier, ticket_record,
    };

    use super::*;

    fn runtime(tickets: Arc<dyn TicketRepository>, events: Arc<dyn EventStore>) -> SweepRuntime {
        SweepRuntime {
            clock: Arc::new(FixedClock::at(2026, 3, 10, 8, 0)),
            tickets,
            events,
            bus: Arc::new(EventBus::new(EventBusConfig::default())),
            notifier: Arc::new(RecordingNotifier::default()),
            links: TrackingLinks::new("https://desk.example/track"),
            policy: SweepPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_run_pass_runs_every_sweep() {
        // Arrange
        let store = Arc::new(InMemoryStore::new());
        let now = FixedClock::at(2026, 3, 10, 8, 0).0;
        let mut stale = ticket_record(
            "TKT-000001",
            TicketStatus::UserDependency,
            Severity::Sev3,
            now - ChronoDuration::days(8),
        );
        stale.exam_date = Some(now.date_naive() - ChronoDuration::days(1));
        let stale_id = stale.id;
        store.put_ticket(stale);
        let runtime = runtime(store.clone(), store.clone());

        // Act
        let pass = runtime.run_pass(TriggeredBy::Schedule).await;

        // Assert
        assert_eq!(pass.auto_resolve.unwrap().processed_count, 1);
        assert_eq!(pass.cleanup.unwrap().processed_count, 0);
        assert!(pass.sla_refresh.is_some());
        assert_eq!(store.ticket(stale_id).unwrap().status, TicketStatus::Resolved);
    }

    #[tokio::test]
    async fn test_run_pass_survives_hard_failures() {
        let runtime = runtime(Arc::new(FailingStore), Arc::new(FailingStore));

        let pass = runtime.run_pass(TriggeredBy::Schedule).await;

        assert_eq!(pass, SweepPass::default());
    }

    #[test]
    fn test_next_run_follows_the_wall_clock() {
        let schedule = Schedule::from_str("0 0 0,12 * * *").unwrap();

        let morning = next_run(&schedule, Utc.with_ymd_and_hms(2026, 3, 10, 8, 15, 0).unwrap());
        let evening = next_run(&schedule, Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap());

        assert_eq!(morning, Some(Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()));
        assert_eq!(evening, Some(Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap()));
    }
}
