//! Notification sink used when no message gateway is configured.

use async_trait::async_trait;
use invigil_core::error::DomainError;
use invigil_core::notify::{Notifier, TicketNotification};
use tracing::info;

/// Records each notification as a structured log line. Delivery over email,
/// SMS or `WhatsApp` is done by an external gateway that tails these lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &TicketNotification) -> Result<(), DomainError> {
        info!(
            kind = ?notification.kind,
            ticket_id = %notification.ticket_id,
            ticket_number = %notification.ticket_number,
            category = %notification.category,
            status = %notification.status,
            tracking_link = %notification.tracking_link,
            "ticket notification"
        );
        Ok(())
    }
}
