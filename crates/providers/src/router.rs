//! Provider router: selects the correct LLM provider based on config.
//!
//! Every catalogue provider with an API key gets an adapter; the graph asks
//! for one by [`ProviderKind`] and never sees the concrete type.

use std::collections::BTreeMap;
use std::sync::Arc;

use shopagent_config::{AppConfig, ProviderKind};
use shopagent_core::error::ProviderError;
use shopagent_core::provider::Provider;
use tracing::debug;

use crate::gemini::GeminiProvider;
use crate::openai_compat::{OpenAiCompatProvider, StructuredOutput};

/// Routes LLM requests to the correct provider.
#[derive(Clone)]
pub struct ProviderRouter {
    providers: BTreeMap<ProviderKind, Arc<dyn Provider>>,
    default_provider: ProviderKind,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: ProviderKind) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider,
        }
    }

    /// Register a provider.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get(self.default_provider)
    }

    /// Get a specific provider.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} (set {} or [providers.{}].api_key)",
                kind.display_name(),
                kind.api_key_env(),
                kind.as_str()
            ))
        })
    }

    /// List all registered providers.
    pub fn list(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }
}

/// Build providers from configuration.
///
/// Providers without an API key are skipped; asking for one later yields
/// `ProviderError::NotConfigured`.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ProviderError> {
    let default_kind = config
        .default_provider_kind()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
    let mut router = ProviderRouter::new(default_kind);

    for kind in ProviderKind::ALL {
        let Some(api_key) = config.api_key(kind) else {
            debug!(provider = %kind, "No API key, skipping provider");
            continue;
        };
        let base_url = config
            .provider(kind)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| kind.default_api_url().to_string());

        let provider: Arc<dyn Provider> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiCompatProvider::new(
                kind.as_str(),
                &base_url,
                api_key,
            )),
            ProviderKind::Groq => Arc::new(
                OpenAiCompatProvider::new(kind.as_str(), &base_url, api_key)
                    .with_structured_output(StructuredOutput::JsonObject),
            ),
            ProviderKind::Google => {
                Arc::new(GeminiProvider::new(api_key).with_base_url(&base_url))
            }
        };

        router.register(kind, provider);
    }

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopagent_config::ProviderConfig;

    fn config_with_keys(keys: &[(ProviderKind, &str)]) -> AppConfig {
        let mut config = AppConfig::default();
        for (kind, key) in keys {
            config.providers.insert(
                kind.as_str().to_string(),
                ProviderConfig {
                    api_key: Some(key.to_string()),
                    ..Default::default()
                },
            );
        }
        config
    }

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new(ProviderKind::OpenAi);
        router.register(
            ProviderKind::OpenAi,
            Arc::new(OpenAiCompatProvider::openai("sk-test")),
        );

        assert!(router.get(ProviderKind::OpenAi).is_ok());
        assert!(router.get(ProviderKind::Groq).is_err());
        assert!(router.default_provider().is_ok());
    }

    #[test]
    fn build_registers_providers_with_keys() {
        let config = config_with_keys(&[(ProviderKind::OpenAi, "sk"), (ProviderKind::Google, "g")]);
        let router = build_from_config(&config).unwrap();
        assert_eq!(router.list(), vec![ProviderKind::OpenAi, ProviderKind::Google]);
        assert_eq!(router.get(ProviderKind::Google).unwrap().name(), "google");
    }

    #[test]
    fn missing_key_reports_env_var() {
        let router = build_from_config(&AppConfig::default()).unwrap();
        let err = router.default_provider().err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn unknown_default_provider_is_rejected() {
        let config = AppConfig {
            default_provider: "mistral".into(),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_err());
    }
}
