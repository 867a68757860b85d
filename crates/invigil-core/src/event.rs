//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::{Actor, ActorRole};

/// Metadata attached to every domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Ticket this event belongs to.
    pub ticket_id: Uuid,
    /// User id of the actor, or `system`.
    pub performed_by: String,
    /// Role the actor held.
    pub performed_by_role: ActorRole,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Timestamp of the mutation.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Builds metadata for a fresh event.
    #[must_use]
    pub fn new(
        ticket_id: Uuid,
        actor: &Actor,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            ticket_id,
            performed_by: actor.id.clone(),
            performed_by_role: actor.role,
            correlation_id,
            occurred_at,
        }
    }
}

/// Trait that all domain events implement.
///
/// Every accepted mutation yields exactly one domain event, which is
/// flattened into a [`crate::repository::StoredEvent`] for the activity log.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// The activity action name (`status_changed`, `assigned`, ...).
    fn action(&self) -> &'static str;

    /// Value before the mutation, as shown in the activity log.
    fn old_value(&self) -> Option<String>;

    /// Value after the mutation, as shown in the activity log.
    fn new_value(&self) -> Option<String>;

    /// Structured details serialized alongside the event.
    fn details(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}
