//! Encounter domain model.

pub mod entities;
pub mod template;
pub mod updates;
