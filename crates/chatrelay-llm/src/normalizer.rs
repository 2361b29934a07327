//! Request normalizer: internal request to provider wire request.
//!
//! [`RequestNormalizer::build`] is a pure transformation. It:
//!
//! 1. prepends one system message (formatting rules, plus the reasoning
//!    layout when reasoning was requested),
//! 2. appends the most recent `history_window` history turns in order,
//! 3. appends the prompt as the final user turn,
//! 4. resolves the effective model (request, then provider default, then
//!    the configured default),
//! 5. injects the provider family's reasoning parameter when the caller
//!    asked for reasoning and the capability table says the model has it.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use chatrelay_types::config::{DEFAULT_HISTORY_WINDOW, DEFAULT_MODEL};
use chatrelay_types::{CompletionRequest, HistoryTurn, ProviderEntry, ValidationError};

use crate::capability::CapabilityTable;
use crate::error::Result;
use crate::types::{ReasoningParam, WireMessage, WireRequest};

/// Formatting rules sent with every request.
pub const FORMAT_INSTRUCTIONS: &str = "You are a knowledge-base assistant.\n\n\
Formatting rules:\n\
1. Keep Markdown lists compact: do not put blank lines between list items.\n\
2. Always close fenced code blocks, in the form ```lang\\ncode\\n```.\n\
3. Keep indentation inside code blocks correct.";

/// Layout for the reasoning channel, appended when reasoning is requested.
pub const REASONING_INSTRUCTIONS: &str = "Deep thinking mode:\n\
Write a structured thought process in the reasoning channel, adapted to the question:\n\n\
### Understanding\n\
The core points and needs of the question.\n\n\
### Approach\n\
How to tackle it: characteristics of the problem, candidate directions, relevant concepts.\n\n\
### Solutions\n\
Concrete solutions or answer points, each with its core idea and where it applies.\n\n\
### Key points\n\
Important details, caveats and additions.\n\n\
Use Markdown, scale depth to the difficulty of the question, and keep it orderly.";

// ── Reasoning families ──────────────────────────────────────────────────

/// Provider families that enable reasoning through different parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningFamily {
    /// Alibaba Qwen: `"enable_thinking": true`.
    Qwen,
    /// DeepSeek: `"reasoning_effort": "high"`.
    DeepSeek,
}

/// Where a family rule looks for its needle.
#[derive(Debug, Clone, Copy)]
enum Haystack {
    Provider,
    Model,
}

/// Ordered classification rules; first match wins.
const FAMILY_RULES: &[(Haystack, &str, ReasoningFamily)] = &[
    (Haystack::Provider, "aliyun", ReasoningFamily::Qwen),
    (Haystack::Provider, "qwen", ReasoningFamily::Qwen),
    (Haystack::Model, "qwen", ReasoningFamily::Qwen),
    (Haystack::Model, "deepseek", ReasoningFamily::DeepSeek),
];

impl ReasoningFamily {
    /// Classify a provider code / model id pair. Matching is a
    /// case-insensitive substring test against [`FAMILY_RULES`].
    pub fn classify(provider: &str, model: &str) -> Option<Self> {
        let provider = provider.to_lowercase();
        let model = model.to_lowercase();
        FAMILY_RULES
            .iter()
            .find(|(haystack, needle, _)| match haystack {
                Haystack::Provider => provider.contains(needle),
                Haystack::Model => model.contains(needle),
            })
            .map(|(_, _, family)| *family)
    }

    /// The wire parameter this family uses to switch reasoning on.
    pub fn param(self) -> ReasoningParam {
        match self {
            ReasoningFamily::Qwen => ReasoningParam {
                name: "enable_thinking",
                value: json!(true),
            },
            ReasoningFamily::DeepSeek => ReasoningParam {
                name: "reasoning_effort",
                value: json!("high"),
            },
        }
    }
}

// ── Normalizer ──────────────────────────────────────────────────────────

/// Builds [`WireRequest`]s. Cheap to clone; the capability table is shared.
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    capabilities: Arc<CapabilityTable>,
    history_window: usize,
    default_model: String,
    system_prompt: Option<String>,
}

impl RequestNormalizer {
    pub fn new(capabilities: Arc<CapabilityTable>) -> Self {
        Self {
            capabilities,
            history_window: DEFAULT_HISTORY_WINDOW,
            default_model: DEFAULT_MODEL.into(),
            system_prompt: None,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Build the wire request for `request` routed to `provider`.
    pub fn build(
        &self,
        request: &CompletionRequest,
        provider: &ProviderEntry,
        streaming: bool,
    ) -> Result<WireRequest> {
        let model = self.resolve_model(request, provider)?;

        let history = window_history(&request.history, self.history_window);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(WireMessage::system(self.system_message(request.reasoning)));
        messages.extend(
            history
                .iter()
                .map(|turn| WireMessage::new(turn.role, turn.content.clone())),
        );
        messages.push(WireMessage::user(request.prompt.clone()));

        // Family follows the provider the caller named, not the fallback.
        let reasoning = if request.reasoning {
            self.reasoning_param(&request.provider, &model, streaming)
        } else {
            None
        };

        debug!(
            provider = %provider.code,
            model = %model,
            messages = messages.len(),
            streaming,
            reasoning = reasoning.is_some(),
            "normalized request"
        );

        Ok(WireRequest {
            model,
            messages,
            stream: streaming,
            reasoning,
        })
    }

    /// Request model, then provider default, then configured default.
    pub fn resolve_model(
        &self,
        request: &CompletionRequest,
        provider: &ProviderEntry,
    ) -> Result<String> {
        [
            request.requested_model(),
            Some(provider.default_model.trim()),
            Some(self.default_model.trim()),
        ]
        .into_iter()
        .flatten()
        .find(|m| !m.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            ValidationError::UnresolvedModel {
                provider: provider.code.clone(),
            }
            .into()
        })
    }

    fn system_message(&self, reasoning: bool) -> String {
        let base = self.system_prompt.as_deref().unwrap_or(FORMAT_INSTRUCTIONS);
        if reasoning {
            format!("{base}\n\n{REASONING_INSTRUCTIONS}")
        } else {
            base.to_owned()
        }
    }

    fn reasoning_param(&self, provider: &str, model: &str, streaming: bool) -> Option<ReasoningParam> {
        if !self.capabilities.supports_reasoning(model) {
            warn!(model = %model, "model does not advertise deep thinking, ignoring request");
            return None;
        }
        match ReasoningFamily::classify(provider, model) {
            Some(family) => {
                debug!(model = %model, ?family, streaming, "enabling deep thinking");
                Some(family.param())
            }
            None => {
                warn!(
                    provider = %provider,
                    model = %model,
                    "model supports deep thinking but its provider family is unknown"
                );
                None
            }
        }
    }
}

/// The most recent `window` turns, in original order.
pub fn window_history(history: &[HistoryTurn], window: usize) -> &[HistoryTurn] {
    &history[history.len().saturating_sub(window)..]
}
