use crate::config::{AppConfig, ProviderConfig};
use crate::providers::{AnthropicProvider, LlmProvider, OpenAiCompatibleProvider, ProviderError};

pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance from configuration
    pub fn create(
        provider_name: &str,
        config: &ProviderConfig,
    ) -> Result<Box<dyn LlmProvider>, ProviderError> {
        // Validate that provider is enabled
        if !config.enabled {
            return Err(format!(
                "Provider '{}' is not enabled in configuration",
                provider_name
            )
            .into());
        }

        match provider_name {
            "groq" | "openai" | "ollama" => Ok(Box::new(OpenAiCompatibleProvider::new(
                provider_name,
                config,
            )?)),
            "anthropic" => Ok(Box::new(AnthropicProvider::new(config)?)),
            _ => Err(format!("Unknown provider: {}", provider_name).into()),
        }
    }

    /// Get the default provider from configuration
    pub fn get_default_provider(config: &AppConfig) -> Result<Box<dyn LlmProvider>, ProviderError> {
        let provider_name = &config.default_provider;
        let provider_config = config.provider(provider_name).ok_or_else(|| {
            format!(
                "Default provider '{}' not found in configuration",
                provider_name
            )
        })?;

        Self::create(provider_name, provider_config)
    }

    /// Model used when a provider has no configuration entry
    pub fn default_model(provider_name: &str) -> Option<&'static str> {
        match provider_name {
            "groq" => Some("llama-3.1-8b-instant"),
            "openai" => Some("gpt-4o-mini"),
            "ollama" => Some("llama3.1"),
            "anthropic" => Some("claude-3-5-haiku-latest"),
            _ => None,
        }
    }

    /// List all available provider names
    pub fn available_providers() -> Vec<&'static str> {
        vec!["groq", "openai", "ollama", "anthropic"]
    }
}
