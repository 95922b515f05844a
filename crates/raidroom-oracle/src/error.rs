//! Oracle error types.

use std::time::Duration;

use thiserror::Error;

/// Why an oracle call did not produce a usable outcome.
///
/// Every variant is recoverable from the room's point of view: any of them
/// sends the turn down its fallback path.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("oracle request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("oracle returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for the log.
        body: String,
    },

    /// The completion carried no message content.
    #[error("oracle returned an empty response")]
    EmptyResponse,

    /// The message content was not valid JSON.
    #[error("oracle response was not valid JSON: {0}")]
    MalformedJson(String),

    /// A required field was absent.
    #[error("oracle response is missing `{0}`")]
    MissingField(&'static str),

    /// A required field had the wrong shape.
    #[error("oracle response field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A request payload could not be encoded.
    #[error("failed to encode oracle request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The call did not settle within the room's deadline.
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    /// The provider is not usable (misconfigured, shut down, test double).
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}
