//! Domain events for ticket assignment.

use invigil_core::actor::AssigneeRole;
use invigil_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

/// Action name recorded for an assignment.
pub const ASSIGNED_ACTION: &str = "assigned";
/// Action name recorded for an unassignment.
pub const UNASSIGNED_ACTION: &str = "unassigned";

/// Emitted for every assignment request, including repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssigned {
    pub user_id: String,
    pub role: AssigneeRole,
    /// The binding already existed; the live set did not change.
    pub already_assigned: bool,
}

/// Emitted when a live binding is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUnassigned {
    pub user_id: String,
    pub role: AssigneeRole,
}

/// Event payload variants for ticket assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentEventKind {
    Assigned(RoleAssigned),
    Unassigned(RoleUnassigned),
}

/// Domain event envelope for ticket assignment.
#[derive(Debug, Clone)]
pub struct AssignmentEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: AssignmentEventKind,
}

impl DomainEvent for AssignmentEvent {
    fn action(&self) -> &'static str {
        match &self.kind {
            AssignmentEventKind::Assigned(_) => ASSIGNED_ACTION,
            AssignmentEventKind::Unassigned(_) => UNASSIGNED_ACTION,
        }
    }

    fn old_value(&self) -> Option<String> {
        match &self.kind {
            AssignmentEventKind::Assigned(_) => None,
            AssignmentEventKind::Unassigned(e) => Some(e.user_id.clone()),
        }
    }

    fn new_value(&self) -> Option<String> {
        match &self.kind {
            AssignmentEventKind::Assigned(e) => Some(e.user_id.clone()),
            AssignmentEventKind::Unassigned(_) => None,
        }
    }

    fn details(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("AssignmentEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
