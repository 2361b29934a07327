//! Error types for chatrelay-llm.
//!
//! All engine operations return [`Result<T>`], which uses [`RelayError`].
//! Upstream status failures carry an already-classified, user-facing
//! message (see [`classify`](crate::classify)).

use chatrelay_types::ValidationError;
use thiserror::Error;

/// Errors surfaced by the gateway engine.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The internal request was rejected before normalization.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The upstream answered with a non-success status before any
    /// streaming began.
    #[error("{message}")]
    UpstreamRejected {
        /// Raw HTTP status code.
        status: u16,
        /// Effective model id of the rejected request.
        model: String,
        /// Classified, user-facing message.
        message: String,
    },

    /// The upstream returned a response envelope with no choices.
    #[error("empty upstream response")]
    EmptyResponse,

    /// The connection failed or dropped before a response arrived.
    #[error("{0}")]
    Transport(String),

    /// The upstream response could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A lookup table is missing a required entry.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// An HTTP-level error from reqwest.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RelayError {
    /// The HTTP status for [`UpstreamRejected`](Self::UpstreamRejected).
    pub fn status(&self) -> Option<u16> {
        match self {
            RelayError::UpstreamRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for engine operations.
pub type Result<T> = std::result::Result<T, RelayError>;
