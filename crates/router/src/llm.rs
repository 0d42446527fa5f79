//! Bounded completion client.
//!
//! Every model call the router makes goes through [`CompletionClient`]: one
//! prompt in, trimmed text out, under a per-attempt timeout and a small
//! retry budget for transient failures.

use std::sync::Arc;
use std::time::Duration;

use medroute_config::ModelConfig;
use medroute_core::error::ProviderError;
use medroute_core::message::Message;
use medroute_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

/// Base delay between retries; grows linearly with the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// A `Provider` wrapper for short, low-randomness completions.
pub struct CompletionClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    max_retries: u32,
}

impl CompletionClient {
    /// A client with deterministic sampling, a 30s timeout and one retry.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }

    /// A client configured from the `[model]` section. Uses the classifier
    /// temperature, since the router only issues constrained prompts.
    pub fn from_config(provider: Arc<dyn Provider>, config: &ModelConfig) -> Self {
        Self {
            provider,
            model: config.name.clone(),
            temperature: config.classifier_temperature,
            max_tokens: None,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The per-attempt timeout. Retrieval reuses it for index calls.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a single-turn prompt and return the trimmed completion text.
    pub async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut request = ProviderRequest::prompt(&self.model, prompt, self.temperature);
        request.max_tokens = self.max_tokens;
        self.send(request).await
    }

    /// Send a system + user exchange at the given temperature. Used for the
    /// user-facing answer once routing has produced its prompts.
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            temperature,
            max_tokens: self.max_tokens,
            stop: Vec::new(),
        };
        self.send(request).await
    }

    async fn send(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.provider.complete(request.clone())).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                ))),
            };

            match result {
                Ok(response) => {
                    debug!(provider = %self.provider.name(), attempt, "Completion received");
                    return Ok(response.message.content.trim().to_string());
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        provider = %self.provider.name(),
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "Transient provider error, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
