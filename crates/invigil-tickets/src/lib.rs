//! Invigil: Ticket lifecycle bounded context.
//!
//! Owns ticket records: submission, the role-gated status state machine,
//! soft deletion, SLA policy, and the filtered listings dashboards read.

pub mod application;
pub mod domain;
