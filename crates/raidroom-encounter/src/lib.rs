//! Raidroom — Encounter context.
//!
//! Owns the combat state of one room: the roster of participants, the single
//! shared boss, the partial-update types the outcome oracle produces, and the
//! merge policy that folds those updates back into the roster.

pub mod application;
pub mod domain;
