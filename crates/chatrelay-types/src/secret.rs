//! Credential wrapper that keeps API keys out of logs.
//!
//! [`SecretString`] is what [`CompletionRequest`](crate::CompletionRequest)
//! carries as its credential. The raw value is only reachable through
//! [`expose`](SecretString::expose), which the HTTP layer calls when it
//! builds the `Authorization` header.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const REDACTED: &str = "[REDACTED]";

/// An API key or token that must never be printed or serialized.
///
/// `Debug` and `Display` print `[REDACTED]` for a non-empty value and
/// nothing for an empty one. Serializing always yields `""`, while
/// deserializing accepts a plain string so credentials can still be read
/// from config or request bodies.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential. Only the transport layer should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` when no credential was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn masked(&self) -> &'static str {
        if self.is_empty() { "" } else { REDACTED }
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.masked())
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.masked())
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_owned())
    }
}
