//! Provider directory: provider code to base URL and default model.
//!
//! The directory is built once from configuration and never mutated. An
//! unknown or empty provider code resolves to the fallback provider, so a
//! caller that forgets to pick a provider ends up on the local Ollama
//! endpoint rather than failing.

use chatrelay_types::ProviderEntry;
use chatrelay_types::config::DEFAULT_FALLBACK_PROVIDER;

use crate::error::{RelayError, Result};

/// Returns the built-in provider table.
pub fn builtin_providers() -> Vec<ProviderEntry> {
    vec![
        ProviderEntry::new(
            "aliyun",
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
            "qwen-turbo",
        ),
        ProviderEntry::new("deepseek", "https://api.deepseek.com", "deepseek-coder"),
        ProviderEntry::new("moonshot", "https://api.moonshot.cn/v1", "moonshot-v1-8k"),
        ProviderEntry::new("openai", "https://api.openai.com/v1", "gpt-3.5-turbo"),
        ProviderEntry::new("ollama", "http://localhost:11434/v1", "llama3"),
    ]
}

/// Immutable provider lookup table.
#[derive(Debug, Clone)]
pub struct ProviderDirectory {
    entries: Vec<ProviderEntry>,
    fallback: String,
}

impl ProviderDirectory {
    /// Directory over the built-in table with `ollama` as fallback.
    pub fn builtin() -> Self {
        Self::from_entries(builtin_providers(), DEFAULT_FALLBACK_PROVIDER)
    }

    /// Directory over `entries`. An empty list means the built-in table.
    pub fn from_entries(entries: Vec<ProviderEntry>, fallback: impl Into<String>) -> Self {
        let entries = if entries.is_empty() {
            builtin_providers()
        } else {
            entries
        };
        Self {
            entries,
            fallback: fallback.into(),
        }
    }

    /// Exact (case-insensitive) lookup, no fallback.
    pub fn lookup(&self, code: &str) -> Option<&ProviderEntry> {
        let code = code.trim();
        self.entries
            .iter()
            .find(|e| e.code.eq_ignore_ascii_case(code))
    }

    /// Lookup with fallback for unknown or empty codes.
    pub fn resolve(&self, code: &str) -> Result<&ProviderEntry> {
        if let Some(entry) = self.lookup(code) {
            return Ok(entry);
        }
        tracing::debug!(
            provider = %code,
            fallback = %self.fallback,
            "unknown provider code, using fallback"
        );
        self.lookup(&self.fallback).ok_or_else(|| {
            RelayError::NotConfigured(format!(
                "provider '{code}' is unknown and fallback '{}' is not in the table",
                self.fallback
            ))
        })
    }

    /// All entries, in table order.
    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    /// The fallback provider code.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}
