//! Tavily web-search provider.
//!
//! POSTs to the Tavily search API with `include_raw_content` so results
//! carry full page text for learning extraction, not just snippets.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ProviderError;
use crate::providers::SearchProvider;
use crate::types::SearchResult;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tavily search API client.
#[derive(Debug)]
pub struct TavilyProvider {
    client: Client,
    api_key: String,
}

impl TavilyProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }

    async fn post_search(&self, body: &Value) -> Result<(reqwest::StatusCode, String), ProviderError> {
        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .timeout(SEARCH_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::ApiRequest {
                provider: "tavily".into(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ProviderError::ApiRequest {
                provider: "tavily".into(),
                message: err.to_string(),
            })?;
        Ok((status, text))
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: "tavily".into(),
            },
            429 => ProviderError::RateLimited {
                provider: "tavily".into(),
            },
            code => ProviderError::Http {
                provider: "tavily".into(),
                status: code,
                message: body.chars().take(300).collect(),
            },
        }
    }

    /// Map a Tavily result object to a SearchResult.
    ///
    /// `raw_content` is the full page text when available; the snippet in
    /// `content` is the fallback. Empty strings map to no content so the
    /// pipeline's usability filter sees them uniformly.
    fn parse_result(value: &Value) -> SearchResult {
        let title = value
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("Untitled")
            .to_string();
        let url = value
            .get("url")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_string();
        let content = value
            .get("raw_content")
            .and_then(|c| c.as_str())
            .filter(|c| !c.trim().is_empty())
            .or_else(|| {
                value
                    .get("content")
                    .and_then(|c| c.as_str())
                    .filter(|c| !c.trim().is_empty())
            })
            .map(|c| c.to_string());
        let relevance_score = value
            .get("score")
            .and_then(|s| s.as_f64())
            .map(|s| s as f32);

        SearchResult {
            title,
            url,
            content,
            relevance_score,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let body = json!({
            "query": query,
            "search_depth": "advanced",
            "include_answer": false,
            "include_raw_content": true,
            "include_images": false,
            "max_results": max_results,
        });

        debug!(query = %query, max_results, "sending tavily search request");

        let (status, text) = self.post_search(&body).await?;
        if !status.is_success() {
            return Err(Self::map_http_error(status, &text));
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|err| ProviderError::ResponseParse {
                provider: "tavily".into(),
                message: format!("invalid JSON: {err}"),
            })?;

        let results = parsed
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| ProviderError::ResponseParse {
                provider: "tavily".into(),
                message: "missing results array".into(),
            })?;

        Ok(results.iter().map(Self::parse_result).collect())
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let body = json!({
            "query": "test",
            "search_depth": "basic",
            "include_answer": false,
            "include_raw_content": false,
            "include_images": false,
            "max_results": 1,
        });

        let (status, text) = self.post_search(&body).await?;
        if !status.is_success() {
            return Err(Self::map_http_error(status, &text));
        }
        Ok(())
    }
}
