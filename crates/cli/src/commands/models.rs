//! `shopagent models`: List supported providers and models.

use shopagent_config::{AppConfig, ProviderKind};
use shopagent_providers::build_from_config;

pub async fn run(remote: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let default_kind = config.default_provider_kind()?;

    println!("Supported providers");
    println!("===================");
    for kind in ProviderKind::ALL {
        let configured = config.api_key(kind).is_some();
        println!();
        println!(
            "  {} ({}){}",
            kind.display_name(),
            kind.as_str(),
            if kind == default_kind { "  [default]" } else { "" }
        );
        println!(
            "    key:    {} ({})",
            if configured { "configured" } else { "missing" },
            kind.api_key_env()
        );
        for model in kind.models() {
            let marker = if *model == kind.default_model() { " *" } else { "" };
            println!("    model:  {model}{marker}");
        }
    }

    if remote {
        let providers = build_from_config(&config)?;
        for kind in providers.list() {
            let provider = providers.get(kind)?;
            match provider.list_models().await {
                Ok(models) => {
                    println!();
                    println!("  {} live models: {}", kind.display_name(), models.len());
                    for model in models {
                        println!("    {model}");
                    }
                }
                Err(e) => eprintln!("  {}: failed to list models: {e}", kind.display_name()),
            }
        }
    }

    println!();
    println!("  Current: {} / {}", config.default_provider, config.default_model);
    Ok(())
}
