//! Invigil Store: `PostgreSQL` implementations of the repository traits.
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so the
//! workspace builds without a database. Every `sqlx::Error` is converted to
//! `DomainError::DependencyUnavailable` before it leaves this crate.

mod error;
mod rows;

pub mod pg_assignee_repository;
pub mod pg_event_store;
pub mod pg_ticket_repository;
pub mod pg_user_directory;
pub mod schema;

pub use pg_assignee_repository::PgAssigneeRepository;
pub use pg_event_store::PgEventStore;
pub use pg_ticket_repository::PgTicketRepository;
pub use pg_user_directory::PgUserDirectory;
