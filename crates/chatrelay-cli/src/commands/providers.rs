//! `chatrelay providers` -- show the provider table and model features.

use chatrelay_llm::{CapabilityTable, ProviderDirectory};
use chatrelay_types::RelayConfig;

use crate::config::{discover_config_path, load_config};

/// Run the providers command.
pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    match config_path.map(std::path::PathBuf::from).or_else(discover_config_path) {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: defaults (set CHATRELAY_CONFIG or ~/.chatrelay/config.json)"),
    }
    let config = load_config(config_path).await?;
    println!();
    print!("{}", render(&config));
    Ok(())
}

/// Render the provider and model tables as plain text.
pub fn render(config: &RelayConfig) -> String {
    let directory = ProviderDirectory::from_entries(config.providers.clone(), config.fallback_provider.clone());
    let capabilities = CapabilityTable::new(&config.models);

    let mut out = String::from("Providers:\n");
    for entry in directory.entries() {
        let marker = if entry.code.eq_ignore_ascii_case(directory.fallback()) {
            " (fallback)"
        } else {
            ""
        };
        out.push_str(&format!(
            "  {:<10} {:<52} {}{marker}\n",
            entry.code, entry.base_url, entry.default_model
        ));
    }

    out.push_str("\nModels:\n");
    if config.models.is_empty() {
        out.push_str("  (none configured; deep thinking disabled for all models)\n");
    }
    for model in &config.models {
        let features = capabilities.features_of(&model.id);
        let features = if features.is_empty() {
            "-".to_owned()
        } else {
            features.join(", ")
        };
        out.push_str(&format!("  {:<24} {features}\n", model.id));
    }
    out
}
