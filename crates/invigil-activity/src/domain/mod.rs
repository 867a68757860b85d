//! Domain layer: reconciliation policy, dedup and grouping, rendering.

pub mod describe;
pub mod entries;
pub mod policy;
pub mod reconcile;
