//! Commands for the sweeps.

use std::fmt;

use invigil_core::actor::Actor;
use invigil_core::command::Command;
use invigil_tickets::domain::events::SweepKind;
use uuid::Uuid;

/// What started a sweep run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggeredBy {
    /// The recurring schedule.
    Schedule,
    /// An operator asked for it.
    Manual { operator: String },
}

impl fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule => f.write_str("schedule"),
            Self::Manual { operator } => write!(f, "manual:{operator}"),
        }
    }
}

/// Command to run one sweep. Every mutation it makes is authored by
/// `system`; the trigger is recorded in event details only.
#[derive(Debug, Clone)]
pub struct RunSweep {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub triggered_by: TriggeredBy,
    actor: Actor,
}

impl RunSweep {
    /// A fresh sweep run.
    #[must_use]
    pub fn new(triggered_by: TriggeredBy) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            triggered_by,
            actor: Actor::system(),
        }
    }
}

impl Command for RunSweep {
    fn command_type(&self) -> &'static str {
        "resolution.run_sweep"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn actor(&self) -> &Actor {
        &self.actor
    }
}

/// Resolution note attached by a sweep.
#[must_use]
pub fn resolution_note(sweep: SweepKind, days_in_dependency: i64) -> String {
    match sweep {
        SweepKind::AutoResolve => format!(
            "Automatically resolved after {days_in_dependency} days awaiting reporter response."
        ),
        SweepKind::Cleanup => {
            "Automatically resolved: exam date has passed while awaiting reporter response."
                .to_owned()
        }
    }
}
