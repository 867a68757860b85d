//! Invigil: Assignment bounded context.
//!
//! Manages the many-to-many relation between tickets and users under a
//! resolver or approver role, and its append-only history.

pub mod application;
pub mod domain;
