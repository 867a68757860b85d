//! Shared test doubles and fixtures for the Invigil ticket lifecycle engine.

mod clock;
mod fixtures;
mod notifier;
mod repository;

pub use clock::FixedClock;
pub use fixtures::{stored_event, ticket_record};
pub use notifier::{FailingNotifier, RecordingNotifier};
pub use repository::{FailingStore, InMemoryStore};
