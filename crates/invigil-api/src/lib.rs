//! Invigil API: HTTP surface of the ticket lifecycle engine.
//!
//! Exposes ticket, assignment, activity, SLA and sweep-trigger endpoints
//! and runs the periodic sweep schedule alongside the server.

pub mod config;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod telemetry;
