//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A command was rejected by domain validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The room actor has shut down or stopped answering.
    #[error("room unavailable")]
    RoomUnavailable,
}
