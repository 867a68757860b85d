//! Domain layer: sweep commands and eligibility policy.

pub mod commands;
pub mod policy;
