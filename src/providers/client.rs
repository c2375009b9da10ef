//! Rate-limited, retrying front door to an [`LlmProvider`].
//!
//! Every oracle call in the crate goes through [`OracleClient`]. It spaces
//! calls with a shared [`RateLimiter`], retries throttled calls with
//! exponential backoff and caps the size of streamed responses.

use crate::config::RetryConfig;
use crate::error::TransformError;
use crate::providers::{LlmProvider, ResponseFormat};
use log::{debug, warn};
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Message fragments that mark a provider error as throttling.
const THROTTLE_MARKERS: [&str; 5] = [
    "rate limit",
    "rate_limit",
    "too many requests",
    "throttle",
    "429",
];

const DEFAULT_RESPONSE_LIMIT: usize = 20_000;

/// Whether a provider error message describes rate limiting.
pub fn is_throttle_error(message: &str) -> bool {
    let message = message.to_lowercase();
    THROTTLE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Minimum spacing between oracle calls, shared by every client holding it.
///
/// The lock is held for the duration of a call, so concurrent callers are
/// serialized and the interval is measured from when the previous call returned.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.min_request_interval())
    }

    /// Wait for the interval to pass, then run `call` while holding the slot.
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        let result = call().await;
        *last = Some(Instant::now());
        result
    }
}

/// Exponential backoff for throttled calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (zero-based): `base × 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Provider plus rate limiting, retry-on-throttle and a response size ceiling.
#[derive(Clone)]
pub struct OracleClient {
    provider: Arc<dyn LlmProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    response_limit: usize,
}

impl OracleClient {
    pub fn new(provider: Arc<dyn LlmProvider>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            limiter,
            retry,
            response_limit: DEFAULT_RESPONSE_LIMIT,
        }
    }

    /// Maximum number of characters a streamed response may reach.
    pub fn with_response_limit(mut self, limit: usize) -> Self {
        self.response_limit = limit;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Free-text completion.
    pub async fn invoke(&self, prompt: &str) -> Result<String, TransformError> {
        self.with_retry(prompt, || self.complete_once(prompt, ResponseFormat::Text))
            .await
    }

    /// Completion in the provider's JSON-object mode.
    pub async fn invoke_json(&self, prompt: &str) -> Result<String, TransformError> {
        self.with_retry(prompt, || self.complete_once(prompt, ResponseFormat::Json))
            .await
    }

    /// Streamed completion, aborted as soon as it grows past the response limit.
    pub async fn stream(&self, prompt: &str) -> Result<String, TransformError> {
        self.with_retry(prompt, || self.stream_once(prompt)).await
    }

    async fn complete_once(&self, prompt: &str, format: ResponseFormat) -> Result<String, TransformError> {
        self.provider
            .complete(prompt, format)
            .await
            .map_err(|e| TransformError::Provider(e.to_string()))
    }

    async fn stream_once(&self, prompt: &str) -> Result<String, TransformError> {
        let limit = self.response_limit;
        let mut buffer = String::new();
        let mut length = 0usize;
        let mut exceeded = false;

        self.provider
            .stream(prompt, &mut |chunk: &str| {
                length += chunk.chars().count();
                if length > limit {
                    exceeded = true;
                    return ControlFlow::Break(());
                }
                buffer.push_str(chunk);
                ControlFlow::Continue(())
            })
            .await
            .map_err(|e| TransformError::Provider(e.to_string()))?;

        if exceeded {
            return Err(TransformError::ResponseTooLarge { length, limit });
        }
        Ok(buffer)
    }

    async fn with_retry<F, Fut>(&self, prompt: &str, mut call: F) -> Result<String, TransformError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, TransformError>>,
    {
        let attempts = self.retry.max_retries + 1;
        for attempt in 0..attempts {
            debug!(
                "Oracle call via {} (attempt {}/{}, prompt {} chars)",
                self.provider.provider_name(),
                attempt + 1,
                attempts,
                prompt.chars().count()
            );

            match self.limiter.run(&mut call).await {
                Err(TransformError::Provider(message)) if is_throttle_error(&message) => {
                    if attempt + 1 == attempts {
                        warn!("Rate limit persisted after {} attempts: {}", attempts, message);
                        break;
                    }
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "Throttled by {} (attempt {}/{}), retrying in {:?}",
                        self.provider.provider_name(),
                        attempt + 1,
                        attempts,
                        delay
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }
        Err(TransformError::RateLimited)
    }
}
