//! Raidroom — Outcome Oracle.
//!
//! The oracle resolves a turn: given the encounter state and what the players
//! (or the boss) did, it returns a narrative and a partial update. The room
//! treats it as an untrusted, slow, fallible collaborator. This crate defines
//! the contract the room depends on, validates raw model output against it,
//! and ships one concrete provider that talks to an OpenAI-compatible
//! chat-completions endpoint.

pub mod client;
pub mod contract;
pub mod error;
pub mod models;
pub mod prompt;
pub mod validation;

pub use client::{ChatCompletionOracle, OracleSettings};
pub use contract::{
    BossTurnOutcome, BossTurnRequest, Oracle, PlayerTurnOutcome, PlayerTurnRequest,
    SubmittedAction,
};
pub use error::OracleError;
