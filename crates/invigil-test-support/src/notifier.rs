//! Test notifiers.

use std::sync::Mutex;

use async_trait::async_trait;
use invigil_core::error::DomainError;
use invigil_core::notify::{Notifier, TicketNotification};

/// Records every notification and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<TicketNotification>>,
}

impl RecordingNotifier {
    /// Returns a snapshot of all notifications sent.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<TicketNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &TicketNotification) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// A notifier whose delivery always fails.
#[derive(Debug)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: &TicketNotification) -> Result<(), DomainError> {
        Err(DomainError::DependencyUnavailable(
            "sms gateway timed out".into(),
        ))
    }
}
