// WHY: One config struct shared by the CLI, the client and the orchestrator
// Every section has defaults so a partial TOML file is valid

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: ModelConfig,
    pub batching: BatchConfig,
    pub retry: RetryConfig,
    /// Capture a debug trace in every result
    pub debug: bool,
}

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Upper bound for one model call
    pub timeout_ms: u64,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_ms: 60_000,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: None,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Token budget per request (4 characters ≈ 1 token)
    pub target_tokens_per_batch: usize,
    /// Batch size cap once a stage has more sentences than this
    pub max_sentences_per_batch: usize,
    /// Batches in flight at once; results are reassembled in input order
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            target_tokens_per_batch: 4000,
            max_sentences_per_batch: 20,
            max_concurrent_batches: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per model call, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt + 1`: base * 2^attempt, capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl ClassifierConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batching.target_tokens_per_batch == 0 {
            return Err(ConfigError::Invalid("batching.target_tokens_per_batch must be > 0".into()));
        }
        if self.batching.max_sentences_per_batch == 0 {
            return Err(ConfigError::Invalid("batching.max_sentences_per_batch must be > 0".into()));
        }
        if self.batching.max_concurrent_batches == 0 {
            return Err(ConfigError::Invalid("batching.max_concurrent_batches must be > 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid("model.temperature must be within 0.0..=2.0".into()));
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(ConfigError::Invalid("model.top_p must be within 0.0..=1.0".into()));
        }
        Ok(())
    }
}
