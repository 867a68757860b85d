//! Invigil: Activity log bounded context.
//!
//! Read side only. Merges the history and legacy timeline streams into one
//! deduplicated feed, folds near-simultaneous identical actions into bulk
//! entries, and renders each entry as a display sentence.

pub mod application;
pub mod domain;
