//! Application layer: sweep handlers, compliance queries, scheduler.

pub mod command_handlers;
pub mod query_handlers;
pub mod scheduler;
