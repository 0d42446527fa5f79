//! Configuration loading, validation, and management for MedRoute.
//!
//! Loads configuration from `~/.medroute/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! `AppConfig` is passed explicitly into every component constructor;
//! nothing reads the environment after this point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.medroute/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Semantic index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Conversation window settings
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider kind, used to pick a default endpoint ("openai", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Explicit base URL of an OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model / deployment name
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature for the user-facing generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Temperature for short classification / adjudication calls
    #[serde(default)]
    pub classifier_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout for model and index calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts on transient failures (rate limit, network, timeout)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            name: default_model(),
            api_key: None,
            temperature: default_temperature(),
            classifier_temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("classifier_temperature", &self.classifier_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Hits for the medical-background query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: default_top_k() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding `medicines.json`, `medical_personnel.json`, ...
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Embedding model; `None` selects the lexical similarity scorer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    /// Characters per chunk for free-text documents
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_data_dir() -> String {
    "./data".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            embedding_model: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Trailing messages rendered into the conversation window
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,
}

fn default_window_turns() -> usize {
    6
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            window_turns: default_window_turns(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.medroute/config.toml).
    ///
    /// Also checks environment variables:
    /// - `MEDROUTE_API_KEY`, then `OPENAI_API_KEY`
    /// - `MEDROUTE_ENDPOINT`, `MEDROUTE_MODEL`, `MEDROUTE_DATA_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.model.api_key.is_none() {
            self.model.api_key = lookup("MEDROUTE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(endpoint) = lookup("MEDROUTE_ENDPOINT") {
            self.model.endpoint = Some(endpoint);
        }
        if let Some(model) = lookup("MEDROUTE_MODEL") {
            self.model.name = model;
        }
        if let Some(dir) = lookup("MEDROUTE_DATA_DIR") {
            self.index.data_dir = dir;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".medroute")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("model.temperature", self.model.temperature),
            ("model.classifier_temperature", self.model.classifier_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{field} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.model.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("model.timeout_secs must be >= 1".into()));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("retrieval.top_k must be >= 1".into()));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(ConfigError::ValidationError(
                "index.chunk_overlap must be smaller than index.chunk_size".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
