//! Shared application state.

use std::sync::Arc;

use invigil_activity::domain::policy::ReconcilePolicy;
use invigil_assignment::application::command_handlers::AssignmentStores;
use invigil_core::bus::{EventBus, EventBusConfig};
use invigil_core::clock::Clock;
use invigil_core::notify::{Notifier, TrackingLinks};
use invigil_core::repository::{AssigneeRepository, EventStore, TicketRepository, UserDirectory};
use invigil_resolution::application::scheduler::SweepRuntime;
use invigil_resolution::domain::policy::SweepPolicy;
use invigil_store::{PgAssigneeRepository, PgEventStore, PgTicketRepository, PgUserDirectory};
use invigil_tickets::application::command_handlers::SideEffects;
use sqlx::PgPool;

/// Tracking link prefix used when none is configured.
pub const DEFAULT_TRACKING_BASE_URL: &str = "https://invigil.local/track";

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic time.
    pub clock: Arc<dyn Clock>,
    pub tickets: Arc<dyn TicketRepository>,
    pub events: Arc<dyn EventStore>,
    pub assignees: Arc<dyn AssigneeRepository>,
    pub users: Arc<dyn UserDirectory>,
    /// Live fan-out of appended events.
    pub bus: Arc<EventBus>,
    pub notifier: Arc<dyn Notifier>,
    pub links: TrackingLinks,
    pub sweep_policy: SweepPolicy,
    pub reconcile_policy: ReconcilePolicy,
}

impl AppState {
    /// State backed by the `PostgreSQL` stores sharing one pool.
    #[must_use]
    pub fn postgres(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        links: TrackingLinks,
        sweep_policy: SweepPolicy,
    ) -> Self {
        Self {
            clock,
            tickets: Arc::new(PgTicketRepository::new(pool.clone())),
            events: Arc::new(PgEventStore::new(pool.clone())),
            assignees: Arc::new(PgAssigneeRepository::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool)),
            bus: Arc::new(EventBus::new(EventBusConfig::default())),
            notifier,
            links,
            sweep_policy,
            reconcile_policy: ReconcilePolicy::default(),
        }
    }

    /// State backed by one store implementing every repository trait.
    #[must_use]
    pub fn with_store<S>(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self
    where
        S: TicketRepository + EventStore + AssigneeRepository + UserDirectory + 'static,
    {
        Self {
            clock,
            tickets: store.clone(),
            events: store.clone(),
            assignees: store.clone(),
            users: store,
            bus: Arc::new(EventBus::new(EventBusConfig::default())),
            notifier,
            links: TrackingLinks::new(DEFAULT_TRACKING_BASE_URL),
            sweep_policy: SweepPolicy::default(),
            reconcile_policy: ReconcilePolicy::default(),
        }
    }

    /// Side-effect collaborators for ticket mutations.
    #[must_use]
    pub fn effects(&self) -> SideEffects<'_> {
        SideEffects {
            bus: &self.bus,
            notifier: self.notifier.as_ref(),
            links: &self.links,
        }
    }

    #[must_use]
    pub fn assignment_stores(&self) -> AssignmentStores<'_> {
        AssignmentStores {
            tickets: self.tickets.as_ref(),
            assignees: self.assignees.as_ref(),
            users: self.users.as_ref(),
            events: self.events.as_ref(),
            bus: &self.bus,
        }
    }

    /// Owned collaborators for the background sweep schedule.
    #[must_use]
    pub fn sweep_runtime(&self) -> SweepRuntime {
        SweepRuntime {
            clock: Arc::clone(&self.clock),
            tickets: Arc::clone(&self.tickets),
            events: Arc::clone(&self.events),
            bus: Arc::clone(&self.bus),
            notifier: Arc::clone(&self.notifier),
            links: self.links.clone(),
            policy: self.sweep_policy,
        }
    }
}
