//! Scripted LLM provider for tests and offline runs.
//!
//! Responses are matched by checking whether the prompt contains a registered
//! substring (case-insensitive, first registration wins). Each pattern owns a
//! queue of outcomes; the last outcome of a queue is repeated once the earlier
//! ones are used up.

use super::{LlmProvider, ProviderError, ResponseFormat};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Outcome = Result<String, String>;

/// Size of the pieces a streamed fake response is delivered in.
const STREAM_CHUNK_CHARS: usize = 16;

#[derive(Debug, Default)]
pub struct FakeProvider {
    scripts: Mutex<Vec<(String, VecDeque<Outcome>)>>,
    default_response: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    /// Create a FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a FakeProvider that returns `response` for prompts containing `pattern`.
    pub fn with_response(pattern: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.push_response(pattern, response);
        provider
    }

    /// Set the response used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Queue a successful completion for prompts containing `pattern`.
    pub fn push_response(&self, pattern: &str, response: &str) {
        self.push(pattern, Ok(response.to_string()));
    }

    /// Queue a failure for prompts containing `pattern`.
    pub fn push_error(&self, pattern: &str, message: &str) {
        self.push(pattern, Err(message.to_string()));
    }

    fn push(&self, pattern: &str, outcome: Outcome) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let pattern = pattern.to_lowercase();
        match scripts.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, queue)) => queue.push_back(outcome),
            None => scripts.push((pattern, VecDeque::from([outcome]))),
        }
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_outcome(&self, prompt: &str) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let prompt_lower = prompt.to_lowercase();
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        for (pattern, queue) in scripts.iter_mut() {
            if !prompt_lower.contains(pattern.as_str()) {
                continue;
            }
            let outcome = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(outcome) = outcome {
                return outcome;
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(format!(
                "FakeProvider: No response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            )),
        }
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, prompt: &str, _format: ResponseFormat) -> Result<String, ProviderError> {
        self.next_outcome(prompt).map_err(ProviderError::from)
    }

    async fn stream(
        &self,
        prompt: &str,
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) -> ControlFlow<()> + Send),
    ) -> Result<(), ProviderError> {
        let text = self.next_outcome(prompt)?;
        let chars: Vec<char> = text.chars().collect();
        for piece in chars.chunks(STREAM_CHUNK_CHARS) {
            let piece: String = piece.iter().collect();
            if on_chunk(&piece).is_break() {
                break;
            }
        }
        Ok(())
    }
}
