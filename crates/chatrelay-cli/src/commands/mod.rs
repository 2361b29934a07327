//! CLI command implementations for `chatrelay`.
//!
//! - [`ask`] -- Blocking completion, printed once finished.
//! - [`stream`] -- Streaming completion, printed as it arrives.
//! - [`providers`] -- Provider table and model features.

pub mod ask;
pub mod providers;
pub mod stream;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;

use chatrelay_llm::{ChatService, ConversationRecord, ConversationStore};
use chatrelay_types::{CompletionRequest, HistoryTurn, RelayConfig};

/// Request flags shared by `ask` and `stream`.
#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Prompt text.
    pub prompt: String,

    /// Provider code (aliyun, deepseek, moonshot, openai, ollama).
    #[arg(short, long, default_value = "")]
    pub provider: String,

    /// Model id (defaults to the provider's default model).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Override the provider base URL for this call.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request deep thinking, if the model supports it.
    #[arg(long)]
    pub think: bool,

    /// JSON file with prior turns: `[{"role": "user", "content": "..."}]`.
    #[arg(long)]
    pub history: Option<String>,

    /// Conversation id (a UUID v4 is generated when absent).
    #[arg(long)]
    pub conversation: Option<String>,

    /// Upstream API key.
    #[arg(long, env = "CHATRELAY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl ChatArgs {
    /// Build the internal request, reading the history file if given.
    pub async fn to_request(&self) -> anyhow::Result<CompletionRequest> {
        let history = match &self.history {
            Some(path) => load_history(Path::new(path)).await?,
            None => Vec::new(),
        };
        let conversation = self
            .conversation
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut request = CompletionRequest::new(self.provider.clone(), self.prompt.clone())
            .with_history(history)
            .with_reasoning(self.think)
            .with_conversation_id(conversation);
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            request = request.with_base_url(base_url.clone());
        }
        if let Some(key) = &self.api_key {
            request = request.with_credential(key.clone());
        }
        Ok(request)
    }
}

/// Read a JSON array of history turns.
pub async fn load_history(path: &Path) -> anyhow::Result<Vec<HistoryTurn>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read history {}: {e}", path.display()))?;
    let turns: Vec<HistoryTurn> = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse history {}: {e}", path.display()))?;
    Ok(turns)
}

/// Conversation store that records saves in the log.
#[derive(Debug, Default)]
pub struct LogStore;

#[async_trait]
impl ConversationStore for LogStore {
    async fn save(&self, record: ConversationRecord) -> Result<(), String> {
        tracing::info!(
            conversation = record.conversation_id.as_deref().unwrap_or("-"),
            answer_len = record.result.answer.len(),
            reasoning_len = record.result.reasoning.as_ref().map_or(0, String::len),
            partial = record.partial,
            finished_at = %record.finished_at,
            "conversation finished"
        );
        Ok(())
    }
}

/// Build the service with the logging store attached.
pub fn build_service(config: &RelayConfig) -> anyhow::Result<ChatService> {
    let store: Arc<dyn ConversationStore> = Arc::new(LogStore);
    Ok(ChatService::from_config(config, Some(store))?)
}
