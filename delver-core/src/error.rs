//! Error types for the Delver research core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering configuration, provider, research-pipeline, and report domains.
//! The pipeline distinguishes three terminal outcomes: a typed fatal error,
//! a cancellation signal, and success; helpers on [`DelverError`] classify
//! which variants may be retried and which represent cancellation.

use std::path::PathBuf;

/// Top-level error type for the Delver core library.
#[derive(Debug, thiserror::Error)]
pub enum DelverError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Research error: {0}")]
    Research(#[from] ResearchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DelverError {
    /// Whether the retry wrapper may re-attempt the failed operation.
    ///
    /// Malformed collaborator output and transient server conditions are
    /// retryable; misconfiguration, unreachable providers, authentication
    /// failures, and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            DelverError::Provider(err) => err.is_retryable(),
            DelverError::Research(err) => {
                matches!(err, ResearchError::InvalidResponse { .. })
            }
            DelverError::Serialization(_) => true,
            _ => false,
        }
    }

    /// Whether this error is the cooperative cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DelverError::Research(ResearchError::Cancelled))
    }
}

/// Errors from LLM and web-search provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No {kind} provider configured")]
    NotConfigured { kind: String },

    #[error("Missing API key for {provider}: set {env_var}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("API request to {provider} failed: {message}")]
    ApiRequest { provider: String, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Failed to parse {provider} response: {message}")]
    ResponseParse { provider: String, message: String },
}

impl ProviderError {
    /// Transient provider conditions that a bounded retry may clear.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::ResponseParse { .. } | ProviderError::RateLimited { .. } => true,
            ProviderError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors from the research pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Malformed {expected} response: {message}")]
    InvalidResponse { expected: String, message: String },

    #[error("Section '{section}' produced no learnings")]
    EmptySection { section: String },

    #[error("Research was cancelled")]
    Cancelled,

    #[error("Invalid research request: {reason}")]
    InvalidRequest { reason: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Errors from report persistence.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A type alias for results using the top-level `DelverError`.
pub type Result<T> = std::result::Result<T, DelverError>;
