use crate::config::ProviderConfig;
use crate::providers::{error_for_status, LlmProvider, ProviderError, ResponseFormat};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::ops::ControlFlow;

/// Known endpoints speaking the OpenAI chat-completions format.
struct Preset {
    name: &'static str,
    base_url: &'static str,
    api_key_env: &'static str,
    requires_key: bool,
}

const PRESETS: [Preset; 3] = [
    Preset {
        name: "groq",
        base_url: "https://api.groq.com/openai",
        api_key_env: "GROQ_API_KEY",
        requires_key: true,
    },
    Preset {
        name: "openai",
        base_url: "https://api.openai.com",
        api_key_env: "OPENAI_API_KEY",
        requires_key: true,
    },
    Preset {
        name: "ollama",
        base_url: "http://localhost:11434",
        api_key_env: "OLLAMA_API_KEY",
        requires_key: false,
    },
];

/// Provider for any chat-completions compatible endpoint (Groq, OpenAI, Ollama)
pub struct OpenAiCompatibleProvider {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for one of the known presets from configuration
    pub fn new(name: &str, config: &ProviderConfig) -> Result<Self, ProviderError> {
        let preset = PRESETS
            .iter()
            .find(|preset| preset.name == name)
            .ok_or_else(|| format!("Unknown provider: {}", name))?;

        // Try config first, then fall back to environment variable
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(preset.api_key_env).ok());
        if preset.requires_key && api_key.is_none() {
            return Err(format!("{} not found in config or environment", preset.api_key_env).into());
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| preset.base_url.to_string());

        Ok(OpenAiCompatibleProvider {
            client: Client::new(),
            name: preset.name.to_string(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String, model: String) -> Self {
        OpenAiCompatibleProvider {
            client: Client::new(),
            name: "openai".to_string(),
            api_key: Some(api_key),
            base_url,
            model,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }

    fn request_body(&self, prompt: &str, format: ResponseFormat, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream
        });
        if format == ResponseFormat::Json {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let mut request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        error_for_status(request.send().await?).await
    }
}

/// Content of one server-sent event line, `None` for keep-alives and `[DONE]`.
fn sse_delta(line: &str) -> Result<Option<String>, ProviderError> {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let event: Value = serde_json::from_str(data)?;
    Ok(event["choices"][0]["delta"]["content"]
        .as_str()
        .map(str::to_string))
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str, format: ResponseFormat) -> Result<String, ProviderError> {
        let body = self.request_body(prompt, format, false);
        let response = self.send(&body).await?;

        let response_body: Value = response.json().await?;
        debug!("{:?}", response_body);
        let content = response_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("Failed to extract content from response")?
            .to_string();

        Ok(content)
    }

    async fn stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> ControlFlow<()> + Send),
    ) -> Result<(), ProviderError> {
        let body = self.request_body(prompt, ResponseFormat::Text, true);
        let mut response = self.send(&body).await?;

        // Events may be split across network chunks, so only complete lines are decoded.
        let mut pending: Vec<u8> = Vec::new();
        while let Some(bytes) = response.chunk().await? {
            pending.extend_from_slice(&bytes);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if let Some(delta) = sse_delta(&String::from_utf8_lossy(&line))? {
                    if on_chunk(&delta).is_break() {
                        return Ok(());
                    }
                }
            }
        }
        if let Some(delta) = sse_delta(&String::from_utf8_lossy(&pending))? {
            let _ = on_chunk(&delta);
        }
        Ok(())
    }
}
