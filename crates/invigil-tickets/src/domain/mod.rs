//! Domain layer: aggregate, commands, events, transition rules, SLA policy.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod sla;
pub mod status;
