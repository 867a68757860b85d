//! Application layer: activity feed queries.

pub mod query_handlers;
