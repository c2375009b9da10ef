use crate::config::ProviderConfig;
use crate::providers::{error_for_status, LlmProvider, ProviderError, ResponseFormat};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// System prompt used when a JSON object is requested; the messages API has no JSON mode.
const JSON_ONLY_SYSTEM: &str = "Respond with a single JSON object and nothing else.";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from configuration
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or("ANTHROPIC_API_KEY not found in config or environment")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(AnthropicProvider {
            client: Client::new(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        AnthropicProvider {
            client: Client::new(),
            api_key,
            base_url,
            model,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });
        if format == ResponseFormat::Json {
            body["system"] = json!(JSON_ONLY_SYSTEM);
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);

        let text = response_body["content"][0]["text"]
            .as_str()
            .ok_or("Failed to extract content from Anthropic response")?
            .to_string();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_anthropic_complete() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(Matcher::PartialJson(json!({"system": JSON_ONLY_SYSTEM})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "text", "text": "{\"complexity\": \"low\"}"}]}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::with_base_url(
            "test-key".to_string(),
            server.url(),
            "claude-3-5-haiku-latest".to_string(),
        );
        let result = provider.complete("Analyze", ResponseFormat::Json).await.unwrap();
        assert_eq!(result, r#"{"complexity": "low"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_anthropic_rate_limited_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .with_body(r#"{"type": "error", "error": {"type": "rate_limit_error"}}"#)
            .create_async()
            .await;

        let provider =
            AnthropicProvider::with_base_url("key".to_string(), server.url(), "m".to_string());
        let err = provider
            .complete("hello", ResponseFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_provider_name() {
        let mut config = ProviderConfig::with_model("claude-3-5-haiku-latest");
        config.api_key = Some("test-key".to_string());
        let provider = AnthropicProvider::new(&config).unwrap();
        assert_eq!(provider.provider_name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }
}
