//! Configuration schema.
//!
//! The whole document deserializes into [`RelayConfig`]. Every field has a
//! default, so `{}` is a valid config. Keys are accepted in both
//! `snake_case` and `camelCase` via `#[serde(alias)]`, and unknown fields
//! are ignored.
//!
//! The engine never mutates a loaded config: it converts it once into
//! immutable lookup tables (provider directory, capability table) that
//! every relay task shares.

use serde::{Deserialize, Serialize};

/// Model used when neither the request nor the provider names one.
pub const DEFAULT_MODEL: &str = "qwen-plus";

/// Provider used for unknown or empty provider codes.
pub const DEFAULT_FALLBACK_PROVIDER: &str = "ollama";

/// How many history turns are forwarded upstream.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Feature flag advertising the reasoning channel.
pub const DEEP_THINKING: &str = "deep_thinking";

// ── Root config ──────────────────────────────────────────────────────────

/// Root configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Model id used when nothing else resolves one.
    #[serde(default = "default_model", alias = "defaultModel")]
    pub default_model: String,

    /// Provider table. Empty means the built-in table.
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Provider code used for unknown or empty codes.
    #[serde(default = "default_fallback", alias = "fallbackProvider")]
    pub fallback_provider: String,

    /// Model feature table: the only source of truth for capabilities.
    #[serde(default)]
    pub models: Vec<ModelDefinition>,

    /// Number of most recent history turns forwarded upstream.
    #[serde(default = "default_history_window", alias = "historyWindow")]
    pub history_window: usize,

    /// Replaces the built-in formatting instruction when set.
    #[serde(default, alias = "systemPrompt")]
    pub system_prompt: Option<String>,

    /// Connect timeout for upstream calls, in seconds.
    #[serde(default = "default_timeout", alias = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,

    /// Persistence hand-off settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            providers: Vec::new(),
            fallback_provider: default_fallback(),
            models: Vec::new(),
            history_window: default_history_window(),
            system_prompt: None,
            request_timeout_secs: default_timeout(),
            persistence: PersistenceConfig::default(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK_PROVIDER.into()
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_timeout() -> u64 {
    30
}

// ── Provider table ───────────────────────────────────────────────────────

/// One row of the provider table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Provider code callers use (e.g. "aliyun").
    pub code: String,

    /// Base URL of the OpenAI-compatible API, without `/chat/completions`.
    #[serde(alias = "baseUrl")]
    pub base_url: String,

    /// Model used when the request does not name one.
    #[serde(default, alias = "defaultModel")]
    pub default_model: String,
}

impl ProviderEntry {
    pub fn new(
        code: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
        }
    }
}

// ── Model feature table ──────────────────────────────────────────────────

/// One row of the model feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model id, matched case-insensitively.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Provider code the model belongs to (informational).
    #[serde(default)]
    pub provider: Option<String>,

    /// Advertised features, e.g. `["streaming", "deep_thinking"]`.
    #[serde(default)]
    pub features: Vec<String>,
}

impl ModelDefinition {
    pub fn new(id: impl Into<String>, features: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: None,
            provider: None,
            features: features.iter().map(|f| (*f).to_owned()).collect(),
        }
    }
}

// ── Persistence ──────────────────────────────────────────────────────────

/// What to do with partial text when the downstream consumer disconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPolicy {
    /// Drop whatever was accumulated.
    #[default]
    Discard,
    /// Save the partial accumulation, flagged as partial.
    Persist,
}

/// Settings for the persistence worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Number of worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Records that may wait for a worker before submitters save inline.
    #[serde(default = "default_queue_capacity", alias = "queueCapacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for queued records, in seconds.
    #[serde(default = "default_shutdown_timeout", alias = "shutdownTimeoutSecs")]
    pub shutdown_timeout_secs: u64,

    /// Partial-text policy on downstream disconnect.
    #[serde(default, alias = "onDisconnect")]
    pub on_disconnect: PartialPolicy,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            on_disconnect: PartialPolicy::default(),
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    200
}

fn default_shutdown_timeout() -> u64 {
    60
}
