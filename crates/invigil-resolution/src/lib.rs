//! Invigil: SLA & auto-resolution bounded context.
//!
//! Runs the sweeps that force-resolve tickets stuck in user dependency,
//! keeps SLA breach flags current, and reports SLA compliance.

pub mod application;
pub mod domain;
