//! OpenAI-compatible chat-completions provider.
//!
//! Serves LM Studio (or any local OpenAI-compatible server) and the hosted
//! OpenRouter API. The two share the wire format and differ only in base
//! URL, authentication, and attribution headers, so one client covers both.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ProviderError;
use crate::providers::LlmProvider;
use crate::types::CompletionOptions;

const LM_STUDIO_BASE_URL: &str = "http://localhost:1234/v1";
const OPEN_ROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible LLM provider.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    name: &'static str,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    /// Extra headers some hosts want for attribution (OpenRouter).
    attribution: &'static [(&'static str, &'static str)],
}

impl OpenAiCompatProvider {
    /// Build a keyless client against a local LM Studio style server.
    ///
    /// `base_url` may omit the `/v1` suffix; it is appended when missing so
    /// a plain `http://localhost:1234` from configuration works.
    pub fn lm_studio(base_url: Option<&str>, model: &str) -> Self {
        let base_url = base_url
            .map(ensure_api_suffix)
            .unwrap_or_else(|| LM_STUDIO_BASE_URL.to_string());
        Self {
            name: "lmstudio",
            client: Client::new(),
            base_url,
            api_key: None,
            model: model.to_string(),
            attribution: &[],
        }
    }

    /// Build a client for the hosted OpenRouter API.
    pub fn open_router(api_key: &str, model: &str) -> Self {
        Self {
            name: "openrouter",
            client: Client::new(),
            base_url: OPEN_ROUTER_BASE_URL.to_string(),
            api_key: Some(api_key.to_string()),
            model: model.to_string(),
            attribution: &[
                ("HTTP-Referer", "https://github.com/delver-rs/delver"),
                ("X-Title", "Delver"),
            ],
        }
    }

    /// The model field sent on the wire; local servers accept a placeholder.
    fn wire_model(&self) -> &str {
        if self.model.is_empty() {
            "local-model"
        } else {
            &self.model
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = builder;
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }
        for (name, value) in self.attribution {
            builder = builder.header(*name, *value);
        }
        builder
    }

    /// Map an HTTP error status to the appropriate ProviderError.
    fn map_http_error(&self, status: reqwest::StatusCode, body: &str) -> ProviderError {
        match status.as_u16() {
            401 | 403 => ProviderError::AuthFailed {
                provider: self.name.to_string(),
            },
            429 => ProviderError::RateLimited {
                provider: self.name.to_string(),
            },
            code => ProviderError::Http {
                provider: self.name.to_string(),
                status: code,
                message: truncate_body(body),
            },
        }
    }

    fn request_error(&self, err: reqwest::Error) -> ProviderError {
        ProviderError::ApiRequest {
            provider: self.name.to_string(),
            message: err.to_string(),
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::ResponseParse {
            provider: self.name.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(
        &self,
        user_prompt: &str,
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.wire_model(),
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
            "stream": false,
        });

        debug!(url = %url, model = %self.wire_model(), "sending chat completion request");

        let response = self
            .request(self.client.post(&url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| self.request_error(err))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|err| self.request_error(err))?;

        if !status.is_success() {
            return Err(self.map_http_error(status, &response_body));
        }

        let parsed: Value = serde_json::from_str(&response_body)
            .map_err(|err| self.parse_error(format!("invalid JSON: {err}")))?;

        parsed
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(|content| content.to_string())
            .ok_or_else(|| self.parse_error("no message content in response"))
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|err| self.request_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_http_error(status, &body));
        }
        Ok(())
    }
}

/// Append `/v1` to a configured base URL that omits it.
fn ensure_api_suffix(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// Keep error bodies log-friendly.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lm_studio_defaults() {
        let provider = OpenAiCompatProvider::lm_studio(None, "");
        assert_eq!(provider.name(), "lmstudio");
        assert_eq!(provider.base_url, LM_STUDIO_BASE_URL);
        assert!(provider.api_key.is_none());
        assert_eq!(provider.wire_model(), "local-model");
    }

    #[test]
    fn test_lm_studio_appends_api_suffix() {
        let provider = OpenAiCompatProvider::lm_studio(Some("http://localhost:1234"), "qwen2.5:7b");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");

        let provider =
            OpenAiCompatProvider::lm_studio(Some("http://localhost:1234/v1/"), "qwen2.5:7b");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
    }

    #[test]
    fn test_open_router_carries_attribution_headers() {
        let provider = OpenAiCompatProvider::open_router("sk-or-test", "openai/gpt-4o-mini");
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.base_url, OPEN_ROUTER_BASE_URL);
        assert_eq!(provider.attribution.len(), 2);
        assert_eq!(provider.wire_model(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_map_http_error_auth() {
        let provider = OpenAiCompatProvider::open_router("bad-key", "m");
        let err = provider.map_http_error(reqwest::StatusCode::UNAUTHORIZED, "{}");
        assert!(matches!(err, ProviderError::AuthFailed { .. }));
    }

    #[test]
    fn test_map_http_error_rate_limited() {
        let provider = OpenAiCompatProvider::open_router("key", "m");
        let err = provider.map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "{}");
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_http_error_server() {
        let provider = OpenAiCompatProvider::open_router("key", "m");
        let err = provider.map_http_error(reqwest::StatusCode::BAD_GATEWAY, "upstream died");
        assert!(matches!(err, ProviderError::Http { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_truncate_body_bounds_length() {
        let long = "x".repeat(1000);
        let truncated = truncate_body(&long);
        assert!(truncated.len() <= 303);
        assert!(truncated.ends_with("..."));
    }
}
