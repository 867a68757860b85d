//! Invigil Core: shared domain abstractions.
//!
//! This crate defines the traits and record types that every bounded
//! context of the ticket lifecycle engine depends on. It contains no
//! infrastructure code: storage, delivery and transport live elsewhere.

pub mod actor;
pub mod aggregate;
pub mod bus;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod notify;
pub mod repository;
pub mod ticket;
