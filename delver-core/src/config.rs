//! Configuration system for Delver.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment. Configuration is loaded from
//! `~/.config/delver/config.toml` and/or `.delver/config.toml` in the
//! workspace directory, then `DELVER_`-prefixed environment variables
//! (`DELVER_LLM__MODEL`, `DELVER_SEARCH__API_KEY`, etc.).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::research::retry::RetryConfig;

/// Top-level configuration for Delver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelverConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub research: ResearchConfig,
    pub report: ReportConfig,
}

/// Which text-generation backend the provider registry constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// A local OpenAI-compatible server (LM Studio, Ollama's compat mode).
    LmStudio,
    /// The hosted OpenRouter API.
    OpenRouter,
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmBackend::LmStudio => write!(f, "lmstudio"),
            LlmBackend::OpenRouter => write!(f, "openrouter"),
        }
    }
}

/// Which web-search backend the provider registry constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    Tavily,
    /// Accepted in configuration but not implemented; the registry returns
    /// a typed "no provider available" outcome for it.
    Perplexity,
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::Tavily => write!(f, "tavily"),
            SearchBackend::Perplexity => write!(f, "perplexity"),
        }
    }
}

/// Configuration for the text-generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend the provider registry constructs.
    pub backend: LlmBackend,
    /// Model identifier forwarded to the backend.
    pub model: String,
    /// Base URL override, primarily for local servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// API key; when unset, `api_key_env` is consulted instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable read when `api_key` is unset.
    pub api_key_env: String,
    /// Maximum tokens requested per completion.
    pub max_output_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Outbound request pacing per minute; 0 disables pacing.
    pub requests_per_minute: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::OpenRouter,
            model: "openai/gpt-4o-mini".into(),
            base_url: None,
            api_key: None,
            api_key_env: "OPENROUTER_API_KEY".into(),
            max_output_tokens: 1000,
            temperature: 0.7,
            requests_per_minute: 5,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty()))
    }
}

/// Configuration for the web-search collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable read when `api_key` is unset.
    pub api_key_env: String,
    /// Outbound request pacing per minute; 0 disables pacing.
    pub requests_per_minute: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Tavily,
            api_key: None,
            api_key_env: "TAVILY_API_KEY".into(),
            requests_per_minute: 5,
        }
    }
}

impl SearchConfig {
    /// Resolve the API key from config or the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok().filter(|key| !key.is_empty()))
    }
}

/// Tunables for the research pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Default section count and query fan-out when a request does not set one.
    pub breadth: usize,
    /// Default bound on gap-refinement rounds per section.
    pub depth: usize,
    /// Token allowance per source chunk handed to learning extraction.
    pub max_chunk_tokens: usize,
    /// Retry policy for collaborator calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            breadth: 5,
            depth: 3,
            max_chunk_tokens: 2000,
            retry: RetryConfig::default(),
        }
    }
}

/// Configuration for report persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory final reports are written into.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

/// Load layered configuration.
///
/// Precedence, lowest to highest: built-in defaults, the user-level config
/// file, the workspace-level config file, environment variables, explicit
/// overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DelverConfig>,
) -> Result<DelverConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(DelverConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "delver", "delver") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".delver").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (DELVER_LLM__MODEL, DELVER_RESEARCH__DEPTH, etc.)
    figment = figment.merge(Env::prefixed("DELVER_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|err| ConfigError::Load {
        message: err.to_string(),
    })
}
