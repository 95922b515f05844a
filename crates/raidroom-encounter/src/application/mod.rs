//! Encounter application services.

pub mod registry;
