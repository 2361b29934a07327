//! Error classifier: upstream failures to user-facing messages.
//!
//! One table, shared by the blocking and the streaming path.

use std::fmt;

/// Category of a non-success upstream status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// 400: usually a parameter the model does not accept.
    BadParameters,
    /// 401: credential rejected.
    Unauthorized,
    /// 404: unknown model.
    ModelNotFound,
    /// 429: throttled or out of quota.
    RateLimited,
    /// Any other non-success status.
    Other(u16),
}

impl UpstreamFailure {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadParameters,
            401 => Self::Unauthorized,
            404 => Self::ModelNotFound,
            429 => Self::RateLimited,
            other => Self::Other(other),
        }
    }

    /// The user-facing message for this failure on `model`.
    pub fn message(self, model: &str) -> String {
        match self {
            Self::BadParameters => format!(
                "bad request: model '{model}' may not support the current reasoning settings"
            ),
            Self::Unauthorized => "authentication failed: invalid API key".to_owned(),
            Self::ModelNotFound => format!("model not found: {model}"),
            Self::RateLimited => "rate limited or quota exhausted, try again later".to_owned(),
            Self::Other(status) => format!("upstream client error: HTTP {status}"),
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadParameters => f.write_str("bad parameters"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::ModelNotFound => f.write_str("model not found"),
            Self::RateLimited => f.write_str("rate limited"),
            Self::Other(status) => write!(f, "HTTP {status}"),
        }
    }
}

/// Classify a non-success status for `model`.
pub fn classify(status: u16, model: &str) -> String {
    UpstreamFailure::from_status(status).message(model)
}

/// Message for a failure that never produced a status (connect errors,
/// dropped connections, body read errors).
pub fn describe_transport(err: &dyn fmt::Display) -> String {
    format!("upstream connection error: {err}")
}
