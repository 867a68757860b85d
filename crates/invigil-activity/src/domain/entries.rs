//! Reconciled feed entries.

use chrono::{DateTime, Utc};
use invigil_core::repository::StoredEvent;
use uuid::Uuid;

/// Several identical actions by one actor within the bulk window.
///
/// Derived on read and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkActivityGroup {
    /// The newest member; its metadata stands for the group.
    pub anchor: StoredEvent,
    /// Every member, anchor first, newest first.
    pub members: Vec<StoredEvent>,
}

impl BulkActivityGroup {
    /// Number of events folded into the group.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Affected tickets in member order, each listed once.
    #[must_use]
    pub fn ticket_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.members.len());
        for member in &self.members {
            if !ids.contains(&member.ticket_id) {
                ids.push(member.ticket_id);
            }
        }
        ids
    }
}

/// One line of the reconciled feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityEntry {
    Single(StoredEvent),
    Bulk(BulkActivityGroup),
}

impl ActivityEntry {
    /// The event whose metadata represents this entry.
    #[must_use]
    pub fn head(&self) -> &StoredEvent {
        match self {
            Self::Single(event) => event,
            Self::Bulk(group) => &group.anchor,
        }
    }

    #[must_use]
    pub fn performed_at(&self) -> DateTime<Utc> {
        self.head().performed_at
    }

    /// Events represented by this entry.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Bulk(group) => group.count(),
        }
    }

    #[must_use]
    pub fn is_bulk(&self) -> bool {
        matches!(self, Self::Bulk(_))
    }

    /// Affected tickets, each listed once.
    #[must_use]
    pub fn ticket_ids(&self) -> Vec<Uuid> {
        match self {
            Self::Single(event) => vec![event.ticket_id],
            Self::Bulk(group) => group.ticket_ids(),
        }
    }
}
