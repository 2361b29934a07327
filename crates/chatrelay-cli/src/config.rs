//! Configuration file discovery and loading.
//!
//! The discovery order is:
//! 1. `--config <path>` (must exist).
//! 2. `CHATRELAY_CONFIG` environment variable.
//! 3. `~/.chatrelay/config.json`
//! 4. If none found, [`RelayConfig::default`].

use std::path::{Path, PathBuf};

use chatrelay_types::RelayConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CHATRELAY_CONFIG";

/// Discover the config file path from the environment and home directory.
pub fn discover_config_path() -> Option<PathBuf> {
    discover_config_path_in(std::env::var(CONFIG_ENV).ok(), dirs::home_dir())
}

/// Discovery with explicit inputs. The env path is returned even if it
/// does not exist so the caller can report it; the home path only if it
/// exists.
pub fn discover_config_path_in(env_path: Option<String>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(env_path) = env_path.filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(env_path));
    }

    let candidate = home_dir?.join(".chatrelay").join("config.json");
    candidate.exists().then_some(candidate)
}

/// Load configuration from the given path override or via auto-discovery.
pub async fn load_config(config_override: Option<&str>) -> anyhow::Result<RelayConfig> {
    if let Some(path_str) = config_override {
        let path = Path::new(path_str);
        if !path.exists() {
            anyhow::bail!("config file not found: {path_str}");
        }
        return read_config(path).await;
    }

    let Some(path) = discover_config_path() else {
        tracing::info!("no config file found, using defaults");
        return Ok(RelayConfig::default());
    };
    if !path.exists() {
        tracing::warn!(path = %path.display(), "config path does not exist, using defaults");
        return Ok(RelayConfig::default());
    }
    read_config(&path).await
}

async fn read_config(path: &Path) -> anyhow::Result<RelayConfig> {
    tracing::debug!(path = %path.display(), "loading config file");
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
    let config: RelayConfig = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_types::PartialPolicy;

    #[test]
    fn env_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover_config_path_in(Some("/etc/chatrelay.json".into()), Some(dir.path().into()));
        assert_eq!(found, Some(PathBuf::from("/etc/chatrelay.json")));
    }

    #[test]
    fn home_path_used_when_present() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(discover_config_path_in(None, Some(home.path().into())), None);

        let dir = home.path().join(".chatrelay");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{}").unwrap();
        assert_eq!(
            discover_config_path_in(None, Some(home.path().into())),
            Some(dir.join("config.json"))
        );
    }

    #[test]
    fn blank_env_ignored() {
        assert_eq!(discover_config_path_in(Some("  ".into()), None), None);
    }

    #[tokio::test]
    async fn explicit_path_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        std::fs::write(
            &path,
            r#"{
                "defaultModel": "deepseek-chat",
                "history_window": 8,
                "models": [{"id": "qwen-plus", "features": ["deep_thinking"]}],
                "persistence": {"on_disconnect": "persist"},
                "unknown": true
            }"#,
        )
        .unwrap();

        let config = load_config(path.to_str()).await.unwrap();
        assert_eq!(config.default_model, "deepseek-chat");
        assert_eq!(config.history_window, 8);
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.persistence.on_disconnect, PartialPolicy::Persist);
        assert_eq!(config.persistence.workers, 4);
    }

    #[tokio::test]
    async fn missing_explicit_path_is_error() {
        let err = load_config(Some("/definitely/not/here.json")).await.unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[tokio::test]
    async fn malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = load_config(path.to_str()).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }
}
