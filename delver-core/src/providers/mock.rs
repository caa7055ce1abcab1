//! Scripted in-process providers for tests and development.
//!
//! The research pipeline fans sections out concurrently, so call order is
//! not deterministic. Responses are therefore matched on prompt content
//! rather than queued FIFO: each rule pairs a substring of the user prompt
//! with the reply to give when it matches.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::providers::{LlmProvider, SearchProvider};
use crate::types::{CompletionOptions, SearchResult};

/// A mock LLM provider driven by prompt-matching rules.
#[derive(Debug)]
pub struct MockLlmProvider {
    rules: Mutex<Vec<(String, String)>>,
    one_shot_errors: Mutex<Vec<(String, ProviderError)>>,
    fallback: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            one_shot_errors: Mutex::new(Vec::new()),
            fallback: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that answers every prompt with the given text.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        *provider.fallback.lock().unwrap() = Some(text.to_string());
        provider
    }

    /// Reply with `response` whenever the user prompt contains `needle`.
    ///
    /// Rules are checked in registration order; the first match wins.
    pub fn respond_when(self, needle: &str, response: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), response.to_string()));
        self
    }

    /// Fail the first prompt containing `needle` with `error`, then fall
    /// through to the normal rules on later matches.
    pub fn fail_once_when(self, needle: &str, error: ProviderError) -> Self {
        self.one_shot_errors
            .lock()
            .unwrap()
            .push((needle.to_string(), error));
        self
    }

    /// All user prompts seen so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many recorded prompts contain `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|prompt| prompt.contains(needle))
            .count()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock-llm"
    }

    async fn complete(
        &self,
        user_prompt: &str,
        _system_prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(user_prompt.to_string());

        let mut errors = self.one_shot_errors.lock().unwrap();
        if let Some(position) = errors
            .iter()
            .position(|(needle, _)| user_prompt.contains(needle.as_str()))
        {
            let (_, error) = errors.remove(position);
            return Err(error);
        }
        drop(errors);

        let rules = self.rules.lock().unwrap();
        if let Some((_, response)) = rules
            .iter()
            .find(|(needle, _)| user_prompt.contains(needle.as_str()))
        {
            return Ok(response.clone());
        }
        drop(rules);

        if let Some(text) = self.fallback.lock().unwrap().clone() {
            return Ok(text);
        }

        let excerpt: String = user_prompt.chars().take(120).collect();
        Err(ProviderError::ApiRequest {
            provider: "mock-llm".into(),
            message: format!("no scripted response for prompt: {excerpt}"),
        })
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// A mock search provider that returns a fixed result set for every query.
#[derive(Debug)]
pub struct MockSearchProvider {
    results: Vec<SearchResult>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    /// Return clones of `results` for every query, truncated to the
    /// requested result count.
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Return no results for any query.
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Fail every search with an API error.
    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// All queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(ProviderError::ApiRequest {
                provider: "mock-search".into(),
                message: "scripted search failure".into(),
            });
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::ApiRequest {
                provider: "mock-search".into(),
                message: "scripted search failure".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rule_matching_prefers_first_match() {
        let provider = MockLlmProvider::new()
            .respond_when("search queries", r#"["q1", "q2"]"#)
            .respond_when("queries", r#"["other"]"#);

        let response = provider
            .complete(
                "Generate search queries for a topic",
                "system",
                &CompletionOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(response, r#"["q1", "q2"]"#);
    }

    #[tokio::test]
    async fn test_unmatched_prompt_is_an_error() {
        let provider = MockLlmProvider::new().respond_when("title", "Solar Report");
        let err = provider
            .complete("something else", "system", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiRequest { .. }));
    }

    #[tokio::test]
    async fn test_fallback_answers_everything() {
        let provider = MockLlmProvider::with_response("always this");
        let response = provider
            .complete("anything", "system", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(response, "always this");
    }

    #[tokio::test]
    async fn test_one_shot_error_then_rule() {
        let provider = MockLlmProvider::new()
            .respond_when("title", "Recovered Title")
            .fail_once_when(
                "title",
                ProviderError::RateLimited {
                    provider: "mock-llm".into(),
                },
            );

        let err = provider
            .complete("Generate a title", "system", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let response = provider
            .complete("Generate a title", "system", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(response, "Recovered Title");
    }

    #[tokio::test]
    async fn test_recorded_calls_and_matching_counts() {
        let provider = MockLlmProvider::with_response("ok");
        let options = CompletionOptions::default();
        provider.complete("first gap pass", "s", &options).await.unwrap();
        provider.complete("second gap pass", "s", &options).await.unwrap();
        provider.complete("unrelated", "s", &options).await.unwrap();

        assert_eq!(provider.calls().len(), 3);
        assert_eq!(provider.calls_matching("gap"), 2);
    }

    #[tokio::test]
    async fn test_search_truncates_to_requested_count() {
        let provider = MockSearchProvider::returning(vec![
            SearchResult::new("a", "https://a.test").with_content("text a"),
            SearchResult::new("b", "https://b.test").with_content("text b"),
            SearchResult::new("c", "https://c.test").with_content("text c"),
        ]);

        let results = provider.search("anything", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(provider.queries(), vec!["anything".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_search_surfaces_error() {
        let provider = MockSearchProvider::failing();
        let err = provider.search("anything", 2).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiRequest { .. }));
    }
}
