//! Typed in-process event bus for live activity updates.
//!
//! Command handlers publish each activity event after it has been persisted.
//! Readers subscribe either to every ticket or to one ticket. Publishing never
//! blocks and never fails: events sent while nobody listens are dropped, and
//! slow receivers observe `RecvError::Lagged` rather than stalling writers.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::repository::StoredEvent;

/// Default capacity of each per-ticket channel.
pub const DEFAULT_TICKET_BUFFER_CAPACITY: usize = 64;
/// Default capacity of the global channel.
pub const DEFAULT_GLOBAL_BUFFER_CAPACITY: usize = 512;

/// Channel capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusConfig {
    pub ticket_buffer_capacity: usize,
    pub global_buffer_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            ticket_buffer_capacity: DEFAULT_TICKET_BUFFER_CAPACITY,
            global_buffer_capacity: DEFAULT_GLOBAL_BUFFER_CAPACITY,
        }
    }
}

/// An event as delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    /// Bus-local publication order.
    pub sequence: u64,
    pub event: StoredEvent,
}

/// Broadcast bus keyed by ticket.
#[derive(Debug)]
pub struct EventBus {
    next_sequence: AtomicU64,
    config: EventBusConfig,
    ticket_senders: RwLock<HashMap<Uuid, broadcast::Sender<EventEnvelope>>>,
    global_sender: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl EventBus {
    /// Creates a bus. Zero capacities are raised to one.
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        let config = EventBusConfig {
            ticket_buffer_capacity: config.ticket_buffer_capacity.max(1),
            global_buffer_capacity: config.global_buffer_capacity.max(1),
        };
        let (global_sender, _) = broadcast::channel(config.global_buffer_capacity);
        Self {
            next_sequence: AtomicU64::new(0),
            config,
            ticket_senders: RwLock::new(HashMap::new()),
            global_sender,
        }
    }

    /// Receive every published event.
    #[must_use]
    pub fn subscribe_all(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global_sender.subscribe()
    }

    /// Receive events of one ticket. Channels whose receivers have all
    /// been dropped are discarded here and on publish.
    pub fn subscribe_ticket(&self, ticket_id: Uuid) -> broadcast::Receiver<EventEnvelope> {
        let mut senders = self
            .ticket_senders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders
            .entry(ticket_id)
            .or_insert_with(|| broadcast::channel(self.config.ticket_buffer_capacity).0)
            .subscribe()
    }

    #[cfg(test)]
    fn ticket_channel_count(&self) -> usize {
        self.ticket_senders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Publish a persisted event to global and per-ticket subscribers.
    pub fn publish(&self, event: StoredEvent) -> EventEnvelope {
        let envelope = EventEnvelope {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            event,
        };

        {
            let mut senders = self
                .ticket_senders
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(sender) = senders.get(&envelope.event.ticket_id) {
                if sender.receiver_count() == 0 {
                    senders.remove(&envelope.event.ticket_id);
                } else {
                    let _ = sender.send(envelope.clone());
                }
            }
        }

        if self.global_sender.receiver_count() > 0 {
            let _ = self.global_sender.send(envelope.clone());
        }

        envelope
    }
}
