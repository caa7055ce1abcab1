//! Iterative research pipeline.
//!
//! Runs a fixed sequence over a request:
//! 1. **Plan** — generate the report's sections from topic and answers
//! 2. **Frame** — generate title and introduction
//! 3. **Research** — per section: search, extract learnings, refine gaps
//! 4. **Synthesize** — write each section's prose from its learnings
//! 5. **Conclude** — close over all learnings and persist the report
//!
//! The pipeline talks to an LLM provider and a web-search provider, both
//! paced by per-minute rate limits and wrapped in the retry policy.

pub mod chunker;
pub mod learnings;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod retry;

pub use chunker::TextChunker;
pub use learnings::LearningStore;
pub use pipeline::Researcher;
pub use progress::{NoOpProgressSink, ProgressSink, ProgressUpdate, ResearchPhase};
pub use report::{MarkdownReportWriter, ReportSink, render_markdown};
pub use retry::RetryConfig;
