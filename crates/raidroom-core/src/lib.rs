//! Raidroom Core — shared domain abstractions.
//!
//! This crate defines the small set of traits and types every other crate
//! depends on: time and randomness seams, connection identity, and the
//! domain error type. It contains no I/O.

pub mod clock;
pub mod error;
pub mod id;
pub mod rng;
