//! Error types for the iCE client.
//!
//! # Design
//! Transport failures are passed through untouched so callers see the
//! underlying I/O error. Everything else is derived from what the server sent
//! back. No variant is marked retryable; the caller decides.

use thiserror::Error;

use crate::http::status_text;

/// Boxed error from whatever executed the HTTP round-trip.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `IceClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS, timeout or body-read failure.
    #[error(transparent)]
    Transport(TransportError),

    /// `my_ip` got a status other than 200.
    #[error("Error: got HTTP response {}", status_line(.status))]
    UnexpectedStatus { status: u16 },

    /// `store_instance` got a status other than 200/201. `message` is built
    /// from the server's error envelope.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The response body was present but could not be decoded.
    #[error("Failed to parse response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// The server accepted the instance but did not return an identifier.
    #[error("Error: response does not include the `_id` field")]
    MissingId,

    /// The instance could not be serialized to JSON.
    #[error(transparent)]
    Serialization(serde_json::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

fn status_line(status: &u16) -> String {
    status_text(*status)
}

impl ApiError {
    pub fn transport(err: impl Into<TransportError>) -> Self {
        ApiError::Transport(err.into())
    }
}
