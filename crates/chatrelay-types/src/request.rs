//! The internal completion request.
//!
//! A [`CompletionRequest`] is what callers hand to the gateway. It is
//! provider-neutral: the normalizer in `chatrelay-llm` turns it into the
//! provider's wire request.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::secret::SecretString;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// The wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A provider-neutral chat completion request.
///
/// Build one with [`CompletionRequest::new`] and the `with_*` methods, then
/// treat it as immutable. Call [`validate`](Self::validate) before sending;
/// the gateway facade does this for you.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Provider code (e.g. "aliyun", "deepseek"). Empty means the
    /// configured fallback provider.
    #[serde(default)]
    pub provider: String,

    /// Model id. `None` or empty means the provider's default model.
    #[serde(default)]
    pub model: Option<String>,

    /// Replaces the provider's base URL for this call only.
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,

    /// Bearer credential. Omitted from the upstream call when empty.
    #[serde(default, alias = "apiKey")]
    pub credential: SecretString,

    /// The current user prompt.
    pub prompt: String,

    /// Prior turns, oldest first.
    #[serde(default, alias = "context")]
    pub history: Vec<HistoryTurn>,

    /// Whether the caller asked for the reasoning channel.
    #[serde(default, alias = "enableDeepThinking")]
    pub reasoning: bool,

    /// Conversation the result should be saved under.
    #[serde(default, alias = "conversationId")]
    pub conversation_id: Option<String>,
}

impl CompletionRequest {
    pub fn new(provider: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<SecretString>) -> Self {
        self.credential = credential.into();
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_reasoning(mut self, reasoning: bool) -> Self {
        self.reasoning = reasoning;
        self
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// The requested model, if one was given and is non-blank.
    pub fn requested_model(&self) -> Option<&str> {
        self.model.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    /// Reject requests that can never produce a valid wire request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        if let Some(url) = self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ValidationError::InvalidBaseUrl(url.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let req = CompletionRequest::new("deepseek", "hi")
            .with_model("deepseek-reasoner")
            .with_reasoning(true)
            .with_conversation_id("c-1")
            .with_history(vec![HistoryTurn::user("a"), HistoryTurn::assistant("b")]);
        assert_eq!(req.provider, "deepseek");
        assert_eq!(req.requested_model(), Some("deepseek-reasoner"));
        assert!(req.reasoning);
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.conversation_id.as_deref(), Some("c-1"));
    }

    #[test]
    fn blank_model_is_not_requested() {
        let req = CompletionRequest::new("openai", "hi").with_model("  ");
        assert_eq!(req.requested_model(), None);
    }

    #[test]
    fn empty_prompt_rejected() {
        let err = CompletionRequest::new("openai", " \n").validate().unwrap_err();
        assert_eq!(err, ValidationError::EmptyPrompt);
    }

    #[test]
    fn base_url_must_be_http() {
        let bad = CompletionRequest::new("openai", "hi").with_base_url("localhost:8080");
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidBaseUrl(_))
        ));

        let good = CompletionRequest::new("openai", "hi").with_base_url("http://127.0.0.1:9/v1");
        assert!(good.validate().is_ok());
    }

    #[test]
    fn deserializes_camel_case_body() {
        let json = r#"{
            "provider": "aliyun",
            "model": "qwen-plus",
            "apiKey": "sk-1",
            "prompt": "hello",
            "enableDeepThinking": true,
            "context": [{"role": "user", "content": "earlier"}]
        }"#;
        let req: CompletionRequest = serde_json::from_str(json).unwrap();
        assert!(req.reasoning);
        assert_eq!(req.credential.expose(), "sk-1");
        assert_eq!(req.history, vec![HistoryTurn::user("earlier")]);
    }

    #[test]
    fn unknown_role_rejected() {
        let json = r#"{"role": "tool", "content": "x"}"#;
        assert!(serde_json::from_str::<HistoryTurn>(json).is_err());
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
