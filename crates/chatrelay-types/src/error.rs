//! Validation errors raised before a request reaches the normalizer.

use thiserror::Error;

/// A [`CompletionRequest`](crate::CompletionRequest) that cannot be sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The prompt was empty or whitespace.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// The base URL override is not an http(s) URL.
    #[error("invalid base url override: {0}")]
    InvalidBaseUrl(String),

    /// No model id could be resolved from the request, the provider, or
    /// the configured default.
    #[error("no model could be resolved for provider '{provider}'")]
    UnresolvedModel {
        /// The provider code the request was routed to.
        provider: String,
    },
}
