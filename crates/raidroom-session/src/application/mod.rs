//! Session application layer.

pub mod actor;
pub mod config;
pub mod hub;
pub mod room;
pub mod timer;
