//! Runtime configuration.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `RAGCHAIN_*` environment
//! variables. Command-line flags are applied on top by the binary.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::MAX_TOP_K;
use crate::error::{codes, AppError};

pub const ENV_RETRIEVAL_URL: &str = "RAGCHAIN_RETRIEVAL_URL";
pub const ENV_GENERATION_URL: &str = "RAGCHAIN_GENERATION_URL";
pub const ENV_MODEL: &str = "RAGCHAIN_MODEL";
pub const ENV_API_KEY: &str = "RAGCHAIN_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Server root; the client appends `/v1/rag/...`.
    #[serde(default = "default_retrieval_url")]
    pub base_url: String,
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: default_retrieval_url(),
            timeout_secs: default_retrieval_timeout(),
        }
    }
}

fn default_retrieval_url() -> String {
    "http://127.0.0.1:11435".to_string()
}
fn default_retrieval_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// OpenAI-compatible root (usually ends in `/v1`); the client appends `/chat/completions`.
    #[serde(default = "default_generation_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Sent as a bearer token. Local backends accept any value but the protocol requires one.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            model: default_model(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

fn default_generation_url() -> String {
    "http://127.0.0.1:11435/v1".to_string()
}
fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_api_key() -> String {
    "local-token".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_generation_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Upper bound on the assembled context block handed to the generation backend.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            system_prompt: None,
        }
    }
}

fn default_top_k() -> u32 {
    5
}
fn default_max_context_chars() -> usize {
    24_000
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| {
            AppError::new(codes::CONFIG_PARSE_FAILED, "Failed to parse config file")
                .with_details(e.to_string())
        })
    }

    /// Load a config file. When `required` is false a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, AppError> {
        if !path.exists() && !required {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new(codes::CONFIG_READ_FAILED, "Failed to read config file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply overrides from an arbitrary variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_RETRIEVAL_URL) {
            self.retrieval.base_url = v;
        }
        if let Some(v) = lookup(ENV_GENERATION_URL) {
            self.generation.base_url = v;
        }
        if let Some(v) = lookup(ENV_MODEL) {
            self.generation.model = v;
        }
        if let Some(v) = lookup(ENV_API_KEY) {
            self.generation.api_key = v;
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()));
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.chain.top_k == 0 || self.chain.top_k > MAX_TOP_K {
            return Err(invalid("chain.top_k out of range")
                .with_details(format!("top_k={}; allowed=1..={MAX_TOP_K}", self.chain.top_k)));
        }
        if self.chain.max_context_chars == 0 {
            return Err(invalid("chain.max_context_chars must be greater than zero"));
        }
        let t = self.generation.temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err(invalid("generation.temperature out of range")
                .with_details(format!("temperature={t}; allowed=0.0..=2.0")));
        }
        if self.generation.model.trim().is_empty() {
            return Err(invalid("generation.model must not be empty"));
        }
        if self.retrieval.timeout_secs == 0 || self.generation.timeout_secs == 0 {
            return Err(invalid("timeouts must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::new(codes::CONFIG_INVALID, message)
}
