//! Collaborator providers: text generation and web search.
//!
//! The research pipeline depends on two trait seams, [`LlmProvider`] and
//! [`SearchProvider`], and never on a concrete backend. The registry
//! functions map the configured backend enum to a constructor and return a
//! typed absence (`NotConfigured` / `MissingApiKey`) instead of a nullable
//! handle, so callers must handle an unusable configuration explicitly.

pub mod mock;
pub mod openai_compat;
pub mod rate_limiter;
pub mod tavily;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmConfig, SearchBackend, SearchConfig};
use crate::error::ProviderError;
use crate::types::{CompletionOptions, SearchResult};

pub use mock::{MockLlmProvider, MockSearchProvider};
pub use openai_compat::OpenAiCompatProvider;
pub use rate_limiter::RateLimiter;
pub use tavily::TavilyProvider;

/// A text-generation collaborator.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one completion and return the raw assistant text.
    async fn complete(
        &self,
        user_prompt: &str,
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError>;

    /// Cheap reachability check used by `delver check`.
    async fn probe(&self) -> Result<(), ProviderError>;
}

/// A web-search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one search. Results may arrive without content; the pipeline
    /// filters those out.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError>;

    /// Cheap reachability check used by `delver check`.
    async fn probe(&self) -> Result<(), ProviderError>;
}

/// Construct the configured text-generation provider.
///
/// Routes on [`LlmBackend`](crate::config::LlmBackend): `lm_studio` builds a
/// keyless client against the local base URL, `open_router` requires an API
/// key (config value or environment variable) and fails with a typed
/// `MissingApiKey` when neither is present.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    use crate::config::LlmBackend;

    match config.backend {
        LlmBackend::LmStudio => Ok(Arc::new(OpenAiCompatProvider::lm_studio(
            config.base_url.as_deref(),
            &config.model,
        ))),
        LlmBackend::OpenRouter => {
            let api_key = config.resolve_api_key().ok_or_else(|| {
                ProviderError::MissingApiKey {
                    provider: "openrouter".into(),
                    env_var: config.api_key_env.clone(),
                }
            })?;
            Ok(Arc::new(OpenAiCompatProvider::open_router(
                &api_key,
                &config.model,
            )))
        }
    }
}

/// Construct the configured web-search provider.
pub fn create_search_provider(
    config: &SearchConfig,
) -> Result<Arc<dyn SearchProvider>, ProviderError> {
    match config.backend {
        SearchBackend::Tavily => {
            let api_key = config.resolve_api_key().ok_or_else(|| {
                ProviderError::MissingApiKey {
                    provider: "tavily".into(),
                    env_var: config.api_key_env.clone(),
                }
            })?;
            Ok(Arc::new(TavilyProvider::new(&api_key)))
        }
        SearchBackend::Perplexity => Err(ProviderError::NotConfigured {
            kind: "web search".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmBackend;

    #[test]
    fn test_registry_builds_lm_studio_without_key() {
        let config = LlmConfig {
            backend: LlmBackend::LmStudio,
            api_key: None,
            api_key_env: "DELVER_TEST_NO_SUCH_VAR".into(),
            ..LlmConfig::default()
        };
        let provider = create_llm_provider(&config).expect("local backend needs no key");
        assert_eq!(provider.name(), "lmstudio");
    }

    #[test]
    fn test_registry_requires_openrouter_key() {
        let config = LlmConfig {
            backend: LlmBackend::OpenRouter,
            api_key: None,
            api_key_env: "DELVER_TEST_NO_SUCH_VAR".into(),
            ..LlmConfig::default()
        };
        let err = create_llm_provider(&config).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey { .. }));
    }

    #[test]
    fn test_registry_builds_tavily_with_key() {
        let config = SearchConfig {
            backend: SearchBackend::Tavily,
            api_key: Some("tvly-test".into()),
            ..SearchConfig::default()
        };
        let provider = create_search_provider(&config).expect("key supplied");
        assert_eq!(provider.name(), "tavily");
    }

    #[test]
    fn test_registry_reports_unimplemented_search_backend() {
        let config = SearchConfig {
            backend: SearchBackend::Perplexity,
            api_key: Some("pplx-test".into()),
            ..SearchConfig::default()
        };
        let err = create_search_provider(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
