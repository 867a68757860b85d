//! Domain layer: aggregate, commands, events.

pub mod aggregates;
pub mod commands;
pub mod events;
