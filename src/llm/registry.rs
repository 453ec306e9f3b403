use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, LlmConfig};
use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::CallConfig;

/// Registry of all available LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    active: String,
    /// Kept for prefix routing and temperature lookups.
    llm_config: LlmConfig,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            active,
            llm_config: LlmConfig {
                active_provider: String::new(),
                providers: HashMap::new(),
            },
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get_active(&self) -> IdeaSwipeResult<Arc<dyn LlmProvider>> {
        self.providers.get(&self.active).cloned().ok_or_else(|| {
            IdeaSwipeError::Config(format!(
                "Active provider '{}' not found in registry",
                self.active
            ))
        })
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Return the provider and call configuration for a requested model.
    ///
    /// Resolution order:
    /// 1. the provider whose `model_prefixes` has the longest match for `model`
    /// 2. fallback: the active provider
    ///
    /// The requested model name is always sent as-is; a blank request falls
    /// back to the chosen provider's default model.
    pub fn resolve(&self, model: &str) -> IdeaSwipeResult<(Arc<dyn LlmProvider>, CallConfig)> {
        let routed = self
            .llm_config
            .providers
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .model_prefixes
                    .iter()
                    .filter(|prefix| model.starts_with(prefix.as_str()))
                    .map(|prefix| prefix.len())
                    .max()
                    .map(|len| (id, len))
            })
            .max_by_key(|(_, len)| *len)
            .map(|(id, _)| id.clone());

        let provider_id = routed.unwrap_or_else(|| self.active.clone());
        let provider = self.providers.get(&provider_id).cloned().ok_or_else(|| {
            IdeaSwipeError::Config(format!("Provider '{provider_id}' not registered"))
        })?;

        let entry = self.llm_config.providers.get(&provider_id);
        let temperature = entry.map(|p| p.temperature).unwrap_or(0.9);
        let model = if model.trim().is_empty() {
            entry.map(|p| p.model.clone()).unwrap_or_default()
        } else {
            model.to_string()
        };

        tracing::debug!(
            provider = %provider_id,
            model = %model,
            temperature,
            "resolved model route"
        );
        Ok((
            provider,
            CallConfig {
                model,
                temperature,
                json_mode: false,
            },
        ))
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `IDEASWIPE_<ID>_API_KEY`.
    pub fn from_config(config: &AppConfig) -> IdeaSwipeResult<Self> {
        let mut registry = Self {
            providers: HashMap::new(),
            active: config.llm.active_provider.clone(),
            llm_config: config.llm.clone(),
        };
        let timeout = Duration::from_secs(config.server.request_timeout_secs);
        for (id, entry) in &config.llm.providers {
            let api_key = std::env::var(format!("IDEASWIPE_{}_API_KEY", id.to_uppercase()))
                .unwrap_or_else(|_| entry.api_key.clone().unwrap_or_default());
            let provider = OpenAiCompatibleProvider::new(
                id.clone(),
                entry.api_base.clone(),
                api_key,
                entry.forward_user_token,
                timeout,
            )?;
            registry.register(Arc::new(provider));
        }
        tracing::info!(
            active = %registry.active,
            providers = ?registry.list_names(),
            "provider registry built"
        );
        Ok(registry)
    }

    /// Registry over explicit providers with routing rules from `llm_config`.
    pub fn with_providers(llm_config: LlmConfig, providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
            active: llm_config.active_provider.clone(),
            llm_config,
        };
        for provider in providers {
            registry.register(provider);
        }
        registry
    }
}
