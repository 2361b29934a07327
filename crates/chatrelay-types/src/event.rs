//! Result and stream event types.
//!
//! [`CompletionResult`] is the terminal value of both execution paths.
//! While streaming, the relay forwards [`RelayEvent`]s to the downstream
//! consumer: zero or more [`RelayEvent::Delta`]s followed by exactly one
//! terminal [`RelayEvent::Completed`] or [`RelayEvent::Failed`].

use serde::{Deserialize, Serialize};

/// Which content channel a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Intermediate deliberation ("thinking") emitted by some models.
    Reasoning,
    /// The answer text proper.
    Answer,
}

impl Channel {
    /// Event name used when re-emitting as server-sent events.
    pub fn event_name(self) -> &'static str {
        match self {
            Channel::Reasoning => "thinking",
            Channel::Answer => "answer",
        }
    }
}

/// One incremental text fragment on a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub channel: Channel,
    pub text: String,
}

impl StreamEvent {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Reasoning,
            text: text.into(),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            channel: Channel::Answer,
            text: text.into(),
        }
    }
}

/// What the relay sends to the downstream consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A fragment, in upstream order.
    Delta(StreamEvent),
    /// The upstream finished normally. No events follow.
    Completed,
    /// The upstream connection failed mid-stream. No events follow.
    Failed {
        /// Human-readable diagnostic.
        message: String,
    },
}

impl RelayEvent {
    /// Returns `true` for [`Completed`](Self::Completed) and
    /// [`Failed`](Self::Failed).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Delta(_))
    }
}

/// Answer text plus optional reasoning text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl CompletionResult {
    /// Build a result, mapping empty reasoning text to `None`.
    pub fn new(answer: impl Into<String>, reasoning: impl Into<String>) -> Self {
        let reasoning = reasoning.into();
        Self {
            answer: answer.into(),
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
        }
    }
}
