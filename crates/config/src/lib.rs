//! Configuration loading, validation, and management for shopagent.
//!
//! Loads configuration from `~/.shopagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod catalogue;
pub mod prompts;

pub use catalogue::ProviderKind;
pub use prompts::PromptConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.shopagent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used by the agent decision step
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used by the agent decision step
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for the agent decision step
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Intent router model settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Agent graph settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Vector index, embedding and reranking settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Prompt template overrides
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Provider-specific configurations, keyed by `openai`, `groq`, `google`
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    ProviderKind::OpenAi.as_str().into()
}
fn default_model() -> String {
    ProviderKind::OpenAi.default_model().into()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("router", &self.router)
            .field("agent", &self.agent)
            .field("retrieval", &self.retrieval)
            .field("prompts", &self.prompts)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// The model that classifies questions before the agent runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Wall-clock deadline for one request, router through final answer
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant_api_key: Option<String>,

    #[serde(default = "default_items_collection")]
    pub items_collection: String,

    #[serde(default = "default_reviews_collection")]
    pub reviews_collection: String,

    /// Embedding model; also the name of the dense vector in both collections
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Results returned to the agent when a call does not pass `top_k`
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Candidates taken from each of the dense and BM25 prefetches
    #[serde(default = "default_prefetch_limit")]
    pub prefetch_limit: usize,

    #[serde(default)]
    pub enable_reranking: bool,

    #[serde(default = "default_reranking_model")]
    pub reranking_model: String,

    #[serde(default = "default_cohere_url")]
    pub cohere_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohere_api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".into()
}
fn default_items_collection() -> String {
    "Amazon-items-collection-01-hybrid-search".into()
}
fn default_reviews_collection() -> String {
    "Amazon-items-collection-01-reviews".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_top_k() -> usize {
    5
}
fn default_prefetch_limit() -> usize {
    20
}
fn default_reranking_model() -> String {
    "rerank-v4.0-fast".into()
}
fn default_cohere_url() -> String {
    "https://api.cohere.com/v2".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            qdrant_url: default_qdrant_url(),
            qdrant_api_key: None,
            items_collection: default_items_collection(),
            reviews_collection: default_reviews_collection(),
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            prefetch_limit: default_prefetch_limit(),
            enable_reranking: false,
            reranking_model: default_reranking_model(),
            cohere_url: default_cohere_url(),
            cohere_api_key: None,
        }
    }
}

impl std::fmt::Debug for RetrievalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalConfig")
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &redact(&self.qdrant_api_key))
            .field("items_collection", &self.items_collection)
            .field("reviews_collection", &self.reviews_collection)
            .field("embedding_model", &self.embedding_model)
            .field("top_k", &self.top_k)
            .field("prefetch_limit", &self.prefetch_limit)
            .field("enable_reranking", &self.enable_reranking)
            .field("reranking_model", &self.reranking_model)
            .field("cohere_url", &self.cohere_url)
            .field("cohere_api_key", &redact(&self.cohere_api_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.shopagent/config.toml).
    ///
    /// Environment overrides:
    /// - `OPENAI_API_KEY`, `GROQ_API_KEY`, `GOOGLE_API_KEY` (only when the file has no key)
    /// - `CO_API_KEY` (Cohere, only when the file has no key)
    /// - `QDRANT_URL`, `SHOPAGENT_PROVIDER`, `SHOPAGENT_MODEL` (always win)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for kind in ProviderKind::ALL {
            let entry = self.providers.entry(kind.as_str().to_string()).or_default();
            if entry.api_key.is_none() {
                entry.api_key = lookup(kind.api_key_env());
            }
        }

        if self.retrieval.cohere_api_key.is_none() {
            self.retrieval.cohere_api_key = lookup("CO_API_KEY");
        }

        if let Some(url) = lookup("QDRANT_URL") {
            self.retrieval.qdrant_url = url;
        }

        if let Some(provider) = lookup("SHOPAGENT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("SHOPAGENT_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shopagent")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.default_provider_kind()?;
        self.router_provider_kind()?;

        for temperature in [self.default_temperature, self.router.temperature] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }

        if self.retrieval.prefetch_limit < self.retrieval.top_k {
            return Err(ConfigError::ValidationError(
                "retrieval.prefetch_limit must be >= retrieval.top_k".into(),
            ));
        }

        if self.agent.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    pub fn default_provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.default_provider
            .parse()
            .map_err(ConfigError::ValidationError)
    }

    pub fn router_provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.router.provider.parse().map_err(ConfigError::ValidationError)
    }

    /// The provider section for `kind`, if any.
    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.get(kind.as_str())
    }

    /// API key for `kind` from config or environment.
    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        self.provider(kind).and_then(|p| p.api_key.as_deref())
    }

    /// Generate a default config TOML string (for `config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            router: RouterConfig::default(),
            agent: AgentConfig::default(),
            retrieval: RetrievalConfig::default(),
            prompts: PromptConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-4.1-mini");
        assert_eq!(config.router.model, "gpt-4.1-mini");
        assert_eq!(config.agent.request_timeout_secs, 120);
        assert_eq!(
            config.retrieval.items_collection,
            "Amazon-items-collection-01-hybrid-search"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.retrieval.top_k, config.retrieval.top_k);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let config = AppConfig {
            default_provider: "anthropic".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn prefetch_smaller_than_top_k_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.top_k = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn loads_partial_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
default_provider = "google"
default_model = "gemini-2.5-flash"

[retrieval]
enable_reranking = true
top_k = 3

[providers.google]
api_key = "from-file"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider_kind().unwrap(), ProviderKind::Google);
        assert!(config.retrieval.enable_reranking);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.prefetch_limit, 20);
        assert_eq!(config.api_key(ProviderKind::Google), Some("from-file"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_provider = [").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_fills_missing_keys_only() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "groq".into(),
            ProviderConfig {
                api_key: Some("from-file".into()),
                ..Default::default()
            },
        );
        config.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("GROQ_API_KEY", "gsk-env"),
            ("CO_API_KEY", "co-env"),
        ]));
        assert_eq!(config.api_key(ProviderKind::OpenAi), Some("sk-env"));
        assert_eq!(config.api_key(ProviderKind::Groq), Some("from-file"));
        assert_eq!(config.api_key(ProviderKind::Google), None);
        assert_eq!(config.retrieval.cohere_api_key.as_deref(), Some("co-env"));
    }

    #[test]
    fn env_overrides_provider_model_and_qdrant() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("SHOPAGENT_PROVIDER", "groq"),
            ("SHOPAGENT_MODEL", "llama-3.3-70b-versatile"),
            ("QDRANT_URL", "http://qdrant:6333"),
        ]));
        assert_eq!(config.default_provider_kind().unwrap(), ProviderKind::Groq);
        assert_eq!(config.default_model, "llama-3.3-70b-versatile");
        assert_eq!(config.retrieval.qdrant_url, "http://qdrant:6333");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "sk-secret"), ("CO_API_KEY", "co-secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("co-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4.1-mini"));
        assert!(toml_str.contains("request_timeout_secs = 120"));
    }
}
