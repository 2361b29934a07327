//! # chatrelay-types
//!
//! Shared data model for the chatrelay completion gateway.
//!
//! Every other chatrelay crate depends on this one. It performs no I/O and
//! contains:
//!
//! - **[`request`]** -- the internal [`CompletionRequest`] callers build
//! - **[`event`]** -- [`CompletionResult`], [`StreamEvent`] and the
//!   downstream [`RelayEvent`] envelope
//! - **[`config`]** -- the configuration schema loaded once at startup
//! - **[`secret`]** -- [`SecretString`] for credentials
//! - **[`error`]** -- [`ValidationError`]

pub mod config;
pub mod error;
pub mod event;
pub mod request;
pub mod secret;

pub use config::{ModelDefinition, PartialPolicy, PersistenceConfig, ProviderEntry, RelayConfig};
pub use error::ValidationError;
pub use event::{Channel, CompletionResult, RelayEvent, StreamEvent};
pub use request::{CompletionRequest, HistoryTurn, Role};
pub use secret::SecretString;
