//! # Delver Core
//!
//! Core library for the Delver research assistant. Provides the research
//! pipeline orchestrator, the LLM and web-search provider interfaces,
//! configuration, and fundamental types.

pub mod config;
pub mod error;
pub mod providers;
pub mod research;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{
    DelverConfig, LlmBackend, LlmConfig, ReportConfig, ResearchConfig, SearchBackend,
    SearchConfig, load_config,
};
pub use error::{ConfigError, DelverError, ProviderError, ReportError, ResearchError, Result};
pub use providers::{
    LlmProvider, MockLlmProvider, MockSearchProvider, OpenAiCompatProvider, RateLimiter,
    SearchProvider, TavilyProvider, create_llm_provider, create_search_provider,
};
pub use research::{
    MarkdownReportWriter, NoOpProgressSink, ProgressSink, ProgressUpdate, ReportSink,
    ResearchPhase, Researcher, RetryConfig, TextChunker, render_markdown,
};
pub use types::{
    ClarifyingAnswer, CompletionOptions, ResearchData, ResearchRequest, SearchResult,
    SectionContent, SectionLearnings,
};
