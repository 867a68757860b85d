//! Domain error types.

use std::fmt;

use thiserror::Error;

use crate::actor::ActorRole;
use crate::ticket::TicketStatus;

/// The kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A ticket record.
    Ticket,
    /// A user known to the directory.
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticket => f.write_str("ticket"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The requested status change is not permitted from the current state
    /// for the acting role.
    #[error("invalid transition from {from} to {to} for role {role}")]
    InvalidTransition {
        /// Status the ticket was in.
        from: TicketStatus,
        /// Status that was requested.
        to: TicketStatus,
        /// Role of the actor that asked for it.
        role: ActorRole,
    },

    /// A ticket or user id did not resolve.
    #[error("no such {entity}: {id}")]
    NotFound {
        /// What kind of entity was looked up.
        entity: EntityKind,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// The backing store or a collaborator could not be reached.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// A validation error in domain logic or request input.
    #[error("validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Shorthand for a missing ticket.
    #[must_use]
    pub fn no_such_ticket(id: impl ToString) -> Self {
        Self::NotFound {
            entity: EntityKind::Ticket,
            id: id.to_string(),
        }
    }

    /// Shorthand for a missing user.
    #[must_use]
    pub fn no_such_user(id: impl ToString) -> Self {
        Self::NotFound {
            entity: EntityKind::User,
            id: id.to_string(),
        }
    }
}
