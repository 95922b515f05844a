//! Session domain types.

pub mod messages;
pub mod pending;
pub mod phase;
