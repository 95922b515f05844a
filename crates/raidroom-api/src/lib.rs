//! Raidroom — API server library.
//!
//! Exposes the configuration, error types, state, telemetry setup and route
//! modules so integration tests can assemble the same router as the binary.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
