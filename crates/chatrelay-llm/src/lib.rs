//! Chat completion gateway engine for chatrelay.
//!
//! This crate turns a provider-agnostic [`CompletionRequest`] into a call
//! against any OpenAI-compatible `/chat/completions` endpoint, either
//! blocking or streamed, and separates reasoning ("thinking") text from
//! answer text on the way back.
//!
//! # Architecture
//!
//! - [`ProviderDirectory`] maps provider codes to base URLs and default models
//! - [`CapabilityTable`] answers "does this model support deep thinking?"
//! - [`RequestNormalizer`] builds the wire request (system prompt, history
//!   window, per-family reasoning parameter)
//! - [`UpstreamClient`] performs the HTTP exchange
//! - [`StreamRelay`] reassembles SSE lines and routes fragments to the
//!   downstream channel
//! - [`PersistencePool`] hands finished conversations to a [`ConversationStore`]
//! - [`ChatService`] wires the above together
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chatrelay_llm::ChatService;
//! use chatrelay_types::{CompletionRequest, RelayConfig};
//!
//! let service = ChatService::from_config(&RelayConfig::default(), None)?;
//! let request = CompletionRequest::new("deepseek", "What is Rust?")
//!     .with_credential(std::env::var("DEEPSEEK_API_KEY")?)
//!     .with_reasoning(true);
//!
//! let result = service.complete(&request).await?;
//! println!("{}", result.answer);
//! ```
//!
//! [`CompletionRequest`]: chatrelay_types::CompletionRequest

pub mod capability;
pub mod classify;
pub mod client;
pub mod directory;
pub mod error;
pub mod extract;
pub mod normalizer;
pub mod persist;
pub mod relay;
pub mod service;
pub mod sse;
pub mod types;

pub use capability::CapabilityTable;
pub use classify::{UpstreamFailure, classify, describe_transport};
pub use client::UpstreamClient;
pub use directory::{ProviderDirectory, builtin_providers};
pub use error::{RelayError, Result};
pub use extract::extract_result;
pub use normalizer::{ReasoningFamily, RequestNormalizer, window_history};
pub use persist::{ConversationRecord, ConversationStore, PersistencePool, Submission};
pub use relay::{RelayOutcome, RelayState, StreamRelay};
pub use service::ChatService;
pub use sse::{LineBuffer, SseLine, classify_line, parse_delta};
pub use types::{WireMessage, WireRequest, WireResponse};
