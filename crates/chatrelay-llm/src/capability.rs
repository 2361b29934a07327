//! Capability resolver over the model feature table.
//!
//! Capability checks fail closed: an unknown model, an empty model id, or
//! an empty table all answer `false`.

use std::collections::{HashMap, HashSet};

use chatrelay_types::ModelDefinition;
use chatrelay_types::config::DEEP_THINKING;

/// Immutable model-id to feature-set table.
///
/// Model ids are matched case-insensitively; feature names are matched
/// exactly.
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    features: HashMap<String, HashSet<String>>,
}

impl CapabilityTable {
    /// Build a table from model definitions. Later duplicates of the same
    /// id (ignoring case) replace earlier ones.
    pub fn new(models: &[ModelDefinition]) -> Self {
        let features = models
            .iter()
            .filter(|m| !m.id.trim().is_empty())
            .map(|m| {
                (
                    m.id.trim().to_lowercase(),
                    m.features.iter().cloned().collect(),
                )
            })
            .collect();
        Self { features }
    }

    /// A table with no models. Every check answers `false`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `model_id` advertises `feature`.
    pub fn supports_feature(&self, model_id: &str, feature: &str) -> bool {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return false;
        }
        self.features
            .get(&model_id.to_lowercase())
            .is_some_and(|set| set.contains(feature))
    }

    /// Shorthand for the `deep_thinking` feature.
    pub fn supports_reasoning(&self, model_id: &str) -> bool {
        self.supports_feature(model_id, DEEP_THINKING)
    }

    /// Features of `model_id`, sorted, for display.
    pub fn features_of(&self, model_id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .features
            .get(&model_id.trim().to_lowercase())
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Number of models in the table.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CapabilityTable {
        CapabilityTable::new(&[
            ModelDefinition::new("qwen-plus", &["streaming", "deep_thinking"]),
            ModelDefinition::new("deepseek-chat", &["streaming"]),
        ])
    }

    #[test]
    fn listed_feature_supported() {
        assert!(table().supports_feature("qwen-plus", "deep_thinking"));
        assert!(table().supports_reasoning("qwen-plus"));
    }

    #[test]
    fn model_match_ignores_case() {
        assert!(table().supports_feature("QWEN-Plus", "deep_thinking"));
    }

    #[test]
    fn feature_match_is_exact() {
        assert!(!table().supports_feature("qwen-plus", "DEEP_THINKING"));
    }

    #[test]
    fn unlisted_feature_not_supported() {
        assert!(!table().supports_reasoning("deepseek-chat"));
    }

    #[test]
    fn unknown_or_empty_model_fails_closed() {
        assert!(!table().supports_reasoning("gpt-9"));
        assert!(!table().supports_reasoning(""));
        assert!(!table().supports_reasoning("   "));
    }

    #[test]
    fn empty_table_always_false() {
        let t = CapabilityTable::empty();
        assert!(t.is_empty());
        assert!(!t.supports_feature("qwen-plus", "deep_thinking"));
    }

    #[test]
    fn features_sorted_for_display() {
        assert_eq!(
            table().features_of("qwen-plus"),
            vec!["deep_thinking", "streaming"]
        );
        assert!(table().features_of("nope").is_empty());
    }
}
