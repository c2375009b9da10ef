//! Turn unstructured recipe text into validated SousChef recipe records.
//!
//! The crate splits "write a full recipe" into small LLM calls (condense,
//! analyze, metadata, outline, one call per step), extracts and normalizes each
//! response, and runs the assembled payload through a bounded
//! validate/repair loop before exporting it as JSON and CSV.
//!
//! # Example
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let outcome = souschef_import::transform_text("Beat 3 eggs. Cook them in butter.").await?;
//! if let Some(json) = outcome.json {
//!     println!("{}", json);
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod extraction;
pub mod generation;
pub mod model;
pub mod normalize;
pub mod pipelines;
pub mod providers;
pub mod validation;
pub mod workflow;

pub use builder::{InputSource, RecipeTransformer, RecipeTransformerBuilder};
pub use crate::config::{load_config, AppConfig};
pub use error::TransformError;
pub use extraction::ExtractError;
pub use model::{Analysis, Recipe};
pub use providers::{FakeProvider, LlmProvider, OracleClient, RateLimiter, RetryPolicy};
pub use workflow::{RecipeWorkflow, WorkflowOutcome, WorkflowStatus};

use std::sync::{Arc, OnceLock};

use crate::config::LimitsConfig;

/// Limiter behind [`transform_text`] and [`transform_url`], created from the
/// first call's `[retry]` configuration.
static CONVENIENCE_LIMITER: OnceLock<Arc<RateLimiter>> = OnceLock::new();

fn convenience_builder(config: AppConfig) -> RecipeTransformerBuilder {
    let limiter = CONVENIENCE_LIMITER
        .get_or_init(|| Arc::new(RateLimiter::from_config(&config.retry)))
        .clone();
    RecipeTransformer::builder()
        .rate_limiter(limiter)
        .config(config)
}

/// Transform pasted recipe text with the configured default provider.
///
/// Repeated calls share one rate limiter, so looping over recipes respects
/// the minimum request interval.
pub async fn transform_text(text: &str) -> Result<WorkflowOutcome, TransformError> {
    convenience_builder(AppConfig::load()?).text(text).build().await
}

/// Scrape a recipe page and transform it with the configured default provider.
pub async fn transform_url(url: &str) -> Result<WorkflowOutcome, TransformError> {
    convenience_builder(AppConfig::load()?).url(url).build().await
}

/// Recipe text of a web page without running any LLM call.
pub async fn fetch_recipe_text(url: &str) -> Result<String, TransformError> {
    pipelines::url::fetch_recipe_text(url, LimitsConfig::default().scrape_chars).await
}
