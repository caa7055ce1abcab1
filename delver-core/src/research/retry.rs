//! Retry policy for collaborator calls.
//!
//! Transient failures (malformed responses, rate limiting, server errors)
//! get a bounded number of re-attempts with a fixed pause between them.
//! Permanent errors return immediately.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DelverError;

/// Retry policy applied around LLM calls in the research pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// How many re-attempts follow the initial try.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_retries() -> u32 {
    1
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
        }
    }
}

/// Run `operation`, re-attempting on retryable errors up to the configured
/// bound. The final error is returned unchanged.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, DelverError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DelverError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= config.max_retries {
                    return Err(err);
                }
                attempt += 1;
                warn!(
                    attempt,
                    max = config.max_retries,
                    delay_ms = config.delay_ms,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
            }
        }
    }
}

/// Like [`with_retry`], but absorb the final error into `fallback`.
///
/// Used where a degraded result is preferable to failing the whole run,
/// such as the report conclusion.
pub async fn with_retry_or<F, Fut, T>(config: &RetryConfig, fallback: T, operation: F) -> T
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DelverError>>,
{
    match with_retry(config, operation).await {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "all attempts failed, using fallback");
            fallback
        }
    }
}
