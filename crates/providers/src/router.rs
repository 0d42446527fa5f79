//! Provider construction from configuration.

use std::sync::Arc;
use medroute_config::AppConfig;
use medroute_core::provider::Provider;
use tracing::{debug, warn};
use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured language-model provider.
///
/// An explicit `model.endpoint` wins; otherwise the endpoint is derived from
/// `model.provider`. Unknown providers without an endpoint fall back to
/// OpenAI.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let model = &config.model;
    let base_url = resolve_base_url(config);
    let api_key = model.api_key.clone().unwrap_or_default();

    debug!(provider = %model.provider, base_url = %base_url, "Building provider");
    Arc::new(OpenAiCompatProvider::new(&model.provider, base_url, api_key))
}

fn resolve_base_url(config: &AppConfig) -> String {
    let model = &config.model;
    match (&model.endpoint, default_base_url(&model.provider)) {
        (Some(endpoint), _) => endpoint.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            warn!(
                provider = %model.provider,
                "Unknown provider and no model.endpoint set, using the OpenAI endpoint"
            );
            OPENAI_BASE_URL.to_string()
        }
    }
}

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some(OPENAI_BASE_URL),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}
