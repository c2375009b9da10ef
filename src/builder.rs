use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::config::{AppConfig, ProviderConfig};
use crate::error::TransformError;
use crate::pipelines::text::load_document;
use crate::model::{InputKind, RecipeInput};
use crate::pipelines::url::fetch_recipe_input;
use crate::providers::{OracleClient, ProviderFactory, RateLimiter, RetryPolicy};
use crate::workflow::{RecipeWorkflow, WorkflowOutcome};

/// Represents the input source for a recipe
#[derive(Debug, Clone)]
pub enum InputSource {
    /// Scrape recipe text from a URL
    Url(String),
    /// Use pasted recipe text
    Text(String),
    /// Read a local `.txt` document
    File(PathBuf),
}

/// Builder for configuring and running a recipe transform
#[derive(Default)]
pub struct RecipeTransformerBuilder {
    source: Option<InputSource>,
    provider: Option<String>,
    timeout: Option<Duration>,
    api_key: Option<String>,
    model: Option<String>,
    max_repair_iterations: Option<u32>,
    oracle: Option<OracleClient>,
    rate_limiter: Option<Arc<RateLimiter>>,
    config: Option<AppConfig>,
}

impl RecipeTransformerBuilder {
    /// Set the input source to a URL
    ///
    /// # Example
    /// ```
    /// use souschef_import::RecipeTransformer;
    ///
    /// let builder = RecipeTransformer::builder()
    ///     .url("https://example.com/recipe");
    /// ```
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(InputSource::Url(url.into()));
        self
    }

    /// Set the input source to pasted recipe text
    ///
    /// # Example
    /// ```
    /// use souschef_import::RecipeTransformer;
    ///
    /// let builder = RecipeTransformer::builder()
    ///     .text("Beat 3 eggs. Cook them in butter over low heat.");
    /// ```
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.source = Some(InputSource::Text(text.into()));
        self
    }

    /// Set the input source to a local text document
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(InputSource::File(path.into()));
        self
    }

    /// Set the LLM provider by name (`groq`, `openai`, `ollama`, `anthropic`)
    ///
    /// # Example
    /// ```
    /// use souschef_import::RecipeTransformer;
    ///
    /// let builder = RecipeTransformer::builder()
    ///     .text("Beat 3 eggs.")
    ///     .provider("anthropic");
    /// ```
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set a timeout for fetching recipe pages
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set the API key for the LLM provider
    ///
    /// This allows passing the API key directly instead of relying on
    /// environment variables or config files.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model name for the LLM provider
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the number of repair passes
    pub fn max_repair_iterations(mut self, max: u32) -> Self {
        self.max_repair_iterations = Some(max);
        self
    }

    /// Use a prebuilt oracle client instead of one created from configuration
    ///
    /// `.provider()`, `.api_key()` and `.model()` are ignored when an oracle is set.
    pub fn oracle(mut self, oracle: OracleClient) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Share a rate limiter with other transforms
    ///
    /// Every oracle call made through the same limiter waits for the configured
    /// interval after the previous one, across builders. Without it each
    /// `build()` creates its own limiter from `[retry]` configuration. Ignored
    /// when `.oracle()` is set.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use souschef_import::{RateLimiter, RecipeTransformer};
    ///
    /// let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
    /// let first = RecipeTransformer::builder().text("Beat 3 eggs.").rate_limiter(limiter.clone());
    /// let second = RecipeTransformer::builder().text("Toast bread.").rate_limiter(limiter);
    /// ```
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Use this configuration instead of loading `config.toml` and `SOUSCHEF__*` variables
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    fn build_oracle(&self, config: &AppConfig) -> Result<OracleClient, TransformError> {
        let name = self
            .provider
            .clone()
            .unwrap_or_else(|| config.default_provider.clone());

        let mut provider_config = match config.provider(&name) {
            Some(existing) => existing.clone(),
            None => {
                let model = ProviderFactory::default_model(&name).ok_or_else(|| {
                    TransformError::BuilderError(format!("Unknown provider: {}", name))
                })?;
                ProviderConfig::with_model(model)
            }
        };
        if let Some(key) = &self.api_key {
            provider_config.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            provider_config.model = model.clone();
        }

        let provider = ProviderFactory::create(&name, &provider_config)
            .map_err(|e| TransformError::Provider(e.to_string()))?;
        debug!("Using provider {} with model {}", name, provider_config.model);

        let limiter = self
            .rate_limiter
            .clone()
            .unwrap_or_else(|| Arc::new(RateLimiter::from_config(&config.retry)));

        Ok(OracleClient::new(
            Arc::from(provider),
            limiter,
            RetryPolicy::from_config(&config.retry),
        )
        .with_response_limit(config.limits.response_chars))
    }

    /// Build and run the transform
    ///
    /// # Returns
    /// The [`WorkflowOutcome`] of the run. Data failures (schema mismatch,
    /// exhausted repairs, generation errors) are reported through its status.
    ///
    /// # Errors
    /// Returns `TransformError` if:
    /// - No input source was specified
    /// - Configuration cannot be loaded
    /// - The provider cannot be created
    /// - The URL fetch or document read fails
    ///
    /// # Example
    /// ```no_run
    /// # use souschef_import::RecipeTransformer;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let outcome = RecipeTransformer::builder()
    ///     .url("https://example.com/recipe")
    ///     .provider("groq")
    ///     .build()
    ///     .await?;
    /// println!("{}", outcome.status);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(mut self) -> Result<WorkflowOutcome, TransformError> {
        let source = self.source.take().ok_or_else(|| {
            TransformError::BuilderError(
                "No input source specified. Use .url(), .text() or .file()".to_string(),
            )
        })?;
        let config = match self.config.take() {
            Some(config) => config,
            None => AppConfig::load()?,
        };

        let oracle = match self.oracle.take() {
            Some(oracle) => oracle,
            None => self.build_oracle(&config)?,
        };

        let input = match source {
            InputSource::Url(url) => {
                let timeout = self
                    .timeout
                    .unwrap_or(Duration::from_secs(config.timeout));
                fetch_recipe_input(&url, config.limits.scrape_chars, Some(timeout)).await?
            }
            InputSource::Text(text) => RecipeInput::new("Pasted recipe", text, InputKind::Text),
            InputSource::File(path) => load_document(&path).await?,
        };
        info!(
            "Transforming \"{}\" ({:?}, {} chars)",
            input.name,
            input.source,
            input.text.chars().count()
        );

        let mut workflow = RecipeWorkflow::new(Some(oracle), &config);
        if let Some(max) = self.max_repair_iterations {
            workflow = workflow.with_max_repair_iterations(max);
        }
        workflow.run(&input.text).await
    }
}

/// Main entry point for the builder API
pub struct RecipeTransformer;

impl RecipeTransformer {
    /// Creates a new builder for transforming recipes
    ///
    /// # Example
    /// ```
    /// use souschef_import::RecipeTransformer;
    ///
    /// let builder = RecipeTransformer::builder();
    /// ```
    pub fn builder() -> RecipeTransformerBuilder {
        RecipeTransformerBuilder::default()
    }
}
