use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main application configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Default provider to use when not specified
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Character ceilings for inputs, prompts and responses
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Rate limiting and retry-on-throttle behavior
    #[serde(default)]
    pub retry: RetryConfig,
    /// Repair loop and normalization policy
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            limits: LimitsConfig::default(),
            retry: RetryConfig::default(),
            workflow: WorkflowConfig::default(),
            timeout: default_timeout(),
        }
    }
}

/// Configuration for a specific LLM provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Model identifier (e.g., "llama-3.1-8b-instant", "gpt-4o-mini")
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// A provider entry with default sampling settings.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            enabled: true,
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key: None,
            base_url: None,
        }
    }
}

/// Character ceilings applied around every oracle call
#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Maximum length of a formatted prompt
    #[serde(default = "default_prompt_chars")]
    pub prompt_chars: usize,
    /// Maximum length of recipe text handed to the generation stages
    #[serde(default = "default_recipe_chars")]
    pub recipe_chars: usize,
    /// Maximum accumulated length of a streamed response
    #[serde(default = "default_response_chars")]
    pub response_chars: usize,
    /// Maximum length of generic page text scraped from a URL
    #[serde(default = "default_scrape_chars")]
    pub scrape_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            prompt_chars: default_prompt_chars(),
            recipe_chars: default_recipe_chars(),
            response_chars: default_response_chars(),
            scrape_chars: default_scrape_chars(),
        }
    }
}

/// Configuration for rate limiting and retry-on-throttle
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Number of retries after a throttled attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds (doubles per attempt)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Ceiling for a single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Minimum spacing between two oracle calls in milliseconds
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }
}

impl RetryConfig {
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// How a nutrition range such as "250-300" collapses to one integer
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    #[default]
    Lower,
    Upper,
    Midpoint,
}

/// Configuration for the validate/repair workflow
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Number of repair passes before the workflow gives up
    #[serde(default = "default_max_repair_iterations")]
    pub max_repair_iterations: u32,
    /// Policy for nutrition ranges
    #[serde(default)]
    pub nutrition_range_policy: RangePolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_repair_iterations: default_max_repair_iterations(),
            nutrition_range_policy: RangePolicy::default(),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "groq".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout() -> u64 {
    60
}

fn default_prompt_chars() -> usize {
    6000
}

fn default_recipe_chars() -> usize {
    3000
}

fn default_response_chars() -> usize {
    20000
}

fn default_scrape_chars() -> usize {
    6000
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

fn default_max_repair_iterations() -> u32 {
    2
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with SOUSCHEF__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: SOUSCHEF__PROVIDERS__GROQ__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }

    /// Configuration for the named provider, if present.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the source priority.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: SOUSCHEF__LIMITS__PROMPT_CHARS
        .add_source(
            Environment::with_prefix("SOUSCHEF")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_provider(), "groq");
        assert_eq!(default_temperature(), 0.3);
        assert_eq!(default_max_tokens(), 2000);
        assert_eq!(default_prompt_chars(), 6000);
        assert_eq!(default_recipe_chars(), 3000);
        assert_eq!(default_max_retries(), 3);
        assert_eq!(default_max_repair_iterations(), 2);
    }

    #[test]
    fn test_retry_config_default() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.base_delay_ms, 1500);
        assert_eq!(retry.max_delay_ms, 8000);
        assert_eq!(retry.min_request_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_workflow_config_default() {
        let workflow = WorkflowConfig::default();
        assert_eq!(workflow.max_repair_iterations, 2);
        assert_eq!(workflow.nutrition_range_policy, RangePolicy::Lower);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let settings = Config::builder()
            .add_source(config::File::from_str(
                r#"
                default_provider = "openai"

                [providers.openai]
                model = "gpt-4o-mini"

                [limits]
                prompt_chars = 8000

                [workflow]
                nutrition_range_policy = "midpoint"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.default_provider, "openai");
        let openai = config.provider("openai").unwrap();
        assert!(openai.enabled);
        assert_eq!(openai.max_tokens, 2000);
        assert_eq!(config.limits.prompt_chars, 8000);
        assert_eq!(config.limits.recipe_chars, 3000);
        assert_eq!(config.workflow.nutrition_range_policy, RangePolicy::Midpoint);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_provider_config_with_model() {
        let config = ProviderConfig::with_model("llama-3.1-8b-instant");
        assert!(config.enabled);
        assert!(config.api_key.is_none());
        assert!(config.base_url.is_none());
    }
}
