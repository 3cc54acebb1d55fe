//! `shopagent config`: Configuration management commands.

use shopagent_config::AppConfig;

/// Effective config with every secret replaced.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }
    for secret in [
        &mut config.retrieval.qdrant_api_key,
        &mut config.retrieval.cohere_api_key,
    ] {
        if secret.is_some() {
            *secret = Some("[REDACTED]".into());
        }
    }
    config
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            let agent_kind = config.default_provider_kind()?;
            if config.api_key(agent_kind).is_none() {
                warnings.push(format!("No API key for {agent_kind} (set {})", agent_kind.api_key_env()));
            }
            let router_kind = config.router_provider_kind()?;
            if router_kind != agent_kind && config.api_key(router_kind).is_none() {
                warnings.push(format!("No API key for router provider {router_kind}"));
            }
            if config.retrieval.enable_reranking && config.retrieval.cohere_api_key.is_none() {
                warnings.push("Reranking enabled but CO_API_KEY is not set".into());
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Provider:   {}", config.default_provider);
            println!("   Model:      {}", config.default_model);
            println!("   Router:     {} / {}", config.router.provider, config.router.model);
            println!("   Qdrant:     {}", config.retrieval.qdrant_url);
            println!("   Collection: {}", config.retrieval.items_collection);
            println!("   Reranking:  {}", config.retrieval.enable_reranking);
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(&config))?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(AppConfig::config_dir())?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
