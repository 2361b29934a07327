//! The gateway facade.
//!
//! [`ChatService`] wires the provider directory, capability table,
//! normalizer, transport and persistence pool together and exposes the two
//! execution paths: [`complete`](ChatService::complete) and
//! [`stream`](ChatService::stream).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use chatrelay_types::{
    CompletionRequest, CompletionResult, PartialPolicy, ProviderEntry, RelayConfig, RelayEvent,
};

use crate::capability::CapabilityTable;
use crate::client::UpstreamClient;
use crate::directory::ProviderDirectory;
use crate::error::Result;
use crate::normalizer::RequestNormalizer;
use crate::persist::{ConversationRecord, ConversationStore, PersistencePool};
use crate::relay::{RelayOutcome, StreamRelay};

/// Shared, immutable gateway. Clone the `Arc` and call from any task.
#[derive(Debug)]
pub struct ChatService {
    directory: Arc<ProviderDirectory>,
    capabilities: Arc<CapabilityTable>,
    normalizer: RequestNormalizer,
    client: UpstreamClient,
    persistence: Option<Arc<PersistencePool>>,
    on_disconnect: PartialPolicy,
}

impl ChatService {
    /// Build from configuration. With a `store`, finished conversations
    /// are handed to a persistence pool; this needs a tokio runtime.
    pub fn from_config(config: &RelayConfig, store: Option<Arc<dyn ConversationStore>>) -> Result<Self> {
        let directory = Arc::new(ProviderDirectory::from_entries(
            config.providers.clone(),
            config.fallback_provider.clone(),
        ));
        let capabilities = Arc::new(CapabilityTable::new(&config.models));
        let normalizer = RequestNormalizer::new(Arc::clone(&capabilities))
            .with_history_window(config.history_window)
            .with_default_model(config.default_model.clone())
            .with_system_prompt(config.system_prompt.clone());
        let client = UpstreamClient::new(Duration::from_secs(config.request_timeout_secs))?;
        let persistence = store.map(|s| Arc::new(PersistencePool::start(s, &config.persistence)));

        info!(
            providers = directory.entries().len(),
            models = capabilities.len(),
            fallback = %directory.fallback(),
            persistence = persistence.is_some(),
            "chat service ready"
        );

        Ok(Self {
            directory,
            capabilities,
            normalizer,
            client,
            persistence,
            on_disconnect: config.persistence.on_disconnect,
        })
    }

    pub fn directory(&self) -> &ProviderDirectory {
        &self.directory
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Blocking path: one request, one full result.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult> {
        request.validate()?;
        let provider = self.route(request)?;
        let wire = self.normalizer.build(request, &provider, false)?;

        let result = self
            .client
            .complete(&provider.base_url, &request.credential, &wire)
            .await?;

        debug!(
            model = %wire.model,
            answer_len = result.answer.len(),
            reasoning = result.reasoning.is_some(),
            "completion finished"
        );
        if let Some(pool) = &self.persistence {
            let record = ConversationRecord::new(request.conversation_id.clone(), result.clone(), false);
            pool.submit(record).await;
        }
        Ok(result)
    }

    /// Streaming path. Validation, routing and upstream rejection are
    /// reported here as `Err`, before any event is sent. Once the upstream
    /// accepts, events flow to `tx` from a spawned relay task whose handle
    /// resolves to the outcome.
    pub async fn stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<RelayEvent>,
    ) -> Result<JoinHandle<RelayOutcome>> {
        request.validate()?;
        let provider = self.route(request)?;
        let wire = self.normalizer.build(request, &provider, true)?;

        let response = self
            .client
            .open_stream(&provider.base_url, &request.credential, &wire)
            .await?;

        let mut relay = StreamRelay::new(tx)
            .with_model(wire.model.clone())
            .with_conversation_id(request.conversation_id.clone());
        if let Some(pool) = &self.persistence {
            relay = relay.with_persistence(Arc::clone(pool), self.on_disconnect);
        }

        debug!(provider = %provider.code, model = %wire.model, "upstream accepted stream");
        Ok(tokio::spawn(relay.run(response.bytes_stream())))
    }

    /// Drain the persistence pool, if any.
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.persistence {
            pool.shutdown().await;
        }
    }

    /// Resolve the provider and apply the per-request base URL override.
    fn route(&self, request: &CompletionRequest) -> Result<ProviderEntry> {
        let mut provider = self.directory.resolve(&request.provider)?.clone();
        if let Some(base_url) = request.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            debug!(provider = %provider.code, base_url, "base URL overridden by request");
            provider.base_url = base_url.to_owned();
        }
        Ok(provider)
    }
}
