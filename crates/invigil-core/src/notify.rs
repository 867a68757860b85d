//! Outbound notification boundary.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DomainError;
use crate::ticket::TicketStatus;

/// Why a notification is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TicketCreated,
    StatusChanged,
}

/// Payload handed to the message-sending collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketNotification {
    pub kind: NotificationKind,
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub category: String,
    pub description: String,
    pub status: TicketStatus,
    /// Link the recipient can follow to track the ticket.
    pub tracking_link: String,
}

/// Delivers ticket notifications over email, SMS or `WhatsApp`.
///
/// Callers must treat failures as non-fatal: a failed delivery never rolls
/// back the ticket mutation that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(&self, notification: &TicketNotification) -> Result<(), DomainError>;
}

/// Builds tracking links of the form `{base}/{ticket_number}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingLinks {
    base_url: String,
}

impl TrackingLinks {
    /// Creates a link builder. Trailing slashes on `base_url` are ignored.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Tracking link for one ticket.
    #[must_use]
    pub fn link_for(&self, ticket_number: &str) -> String {
        format!("{}/{ticket_number}", self.base_url)
    }
}
