mod anthropic;
mod client;
mod factory;
mod fake;
mod openai_compatible;

pub use anthropic::AnthropicProvider;
pub use client::{is_throttle_error, OracleClient, RateLimiter, RetryPolicy};
pub use factory::ProviderFactory;
pub use fake::FakeProvider;
pub use openai_compatible::OpenAiCompatibleProvider;

use async_trait::async_trait;
use std::error::Error;
use std::ops::ControlFlow;

/// Error type returned by provider implementations.
pub type ProviderError = Box<dyn Error + Send + Sync>;

/// Output mode requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free text
    #[default]
    Text,
    /// A single JSON object (the provider's structured-output mode)
    Json,
}

/// Unified trait for all LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "groq", "anthropic")
    fn provider_name(&self) -> &str;

    /// Send one prompt and return the whole completion
    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, ProviderError>;

    /// Send one prompt and hand the completion to `on_chunk` piece by piece.
    ///
    /// Returning `ControlFlow::Break` from `on_chunk` stops reading the
    /// response. Providers without a streaming transport deliver the full
    /// completion as a single chunk.
    async fn stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> ControlFlow<()> + Send),
    ) -> Result<(), ProviderError> {
        let text = self.complete(prompt, ResponseFormat::Text).await?;
        let _ = on_chunk(&text);
        Ok(())
    }
}

/// Turn a non-2xx response into an error carrying the status code and body.
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("HTTP {}: {}", status.as_u16(), body.trim()).into())
}
