//! Core type definitions for the Delver research pipeline.
//!
//! Defines the document model that flows through a research run: the
//! immutable request, web search results, per-section learnings and
//! synthesized content, and the final aggregate report data.

use serde::{Deserialize, Serialize};

use crate::error::ResearchError;

/// One clarifying question the user answered before research started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarifyingAnswer {
    pub question: String,
    pub answer: String,
}

impl ClarifyingAnswer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// An immutable research request.
///
/// `breadth` controls the planned section count and the fan-out width of
/// search-query generation; `depth` bounds the gap-refinement rounds run
/// for each section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
    #[serde(default)]
    pub clarifying_answers: Vec<ClarifyingAnswer>,
    pub breadth: usize,
    pub depth: usize,
}

impl ResearchRequest {
    /// Create a request with the stock breadth/depth defaults.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            clarifying_answers: Vec::new(),
            breadth: 5,
            depth: 3,
        }
    }

    pub fn with_breadth(mut self, breadth: usize) -> Self {
        self.breadth = breadth;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_answer(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.clarifying_answers
            .push(ClarifyingAnswer::new(question, answer));
        self
    }

    /// Reject requests the pipeline cannot act on.
    pub fn validate(&self) -> Result<(), ResearchError> {
        if self.topic.trim().is_empty() {
            return Err(ResearchError::InvalidRequest {
                reason: "topic must not be empty".into(),
            });
        }
        if self.breadth == 0 {
            return Err(ResearchError::InvalidRequest {
                reason: "breadth must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// One result from the web-search collaborator.
///
/// `content` is the extracted page text; `None` or empty means the source
/// yielded nothing usable and the pipeline filters it out before learning
/// extraction. `relevance_score` is provider-assigned when available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f32>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: None,
            relevance_score: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_relevance(mut self, score: f32) -> Self {
        self.relevance_score = Some(score);
        self
    }

    /// Whether this result carries any usable text.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

/// Accumulated source-cited facts for one section.
///
/// Learnings keep append order: the initial research batch first, then each
/// gap-driven batch. They are never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLearnings {
    pub section: String,
    pub learnings: Vec<String>,
}

/// Synthesized prose for one section, produced exactly once per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionContent {
    pub section: String,
    pub content: String,
}

/// The final aggregate produced by a completed research run.
///
/// `section_content` holds exactly one entry per entry in `sections`, in the
/// same order. A run never returns partially populated data: the caller sees
/// this struct, a typed error, or the cancellation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchData {
    pub topic: String,
    pub title: String,
    pub introduction: String,
    pub sections: Vec<String>,
    pub section_content: Vec<SectionContent>,
    pub conclusion: String,
    pub depth: usize,
}

/// Tunables forwarded with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub max_output_tokens: usize,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 0.7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ResearchRequest::new("Solar Energy")
            .with_breadth(2)
            .with_depth(1)
            .with_answer("Residential or utility scale?", "Residential");

        assert_eq!(request.topic, "Solar Energy");
        assert_eq!(request.breadth, 2);
        assert_eq!(request.depth, 1);
        assert_eq!(request.clarifying_answers.len(), 1);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_empty_topic() {
        let request = ResearchRequest::new("   ");
        assert!(matches!(
            request.validate(),
            Err(ResearchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_request_validation_rejects_zero_breadth() {
        let request = ResearchRequest::new("Solar Energy").with_breadth(0);
        assert!(matches!(
            request.validate(),
            Err(ResearchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_search_result_content_detection() {
        let empty = SearchResult::new("Page", "https://example.com/a");
        assert!(!empty.has_content());

        let blank = SearchResult::new("Page", "https://example.com/b").with_content("   \n ");
        assert!(!blank.has_content());

        let usable = SearchResult::new("Page", "https://example.com/c")
            .with_content("Solar capacity grew 24% in 2024.");
        assert!(usable.has_content());
    }

    #[test]
    fn test_search_result_serde_omits_absent_fields() {
        let result = SearchResult::new("Page", "https://example.com");
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("content"));
        assert!(!json.contains("relevance_score"));
    }

    #[test]
    fn test_default_completion_options() {
        let options = CompletionOptions::default();
        assert_eq!(options.max_output_tokens, 1000);
        assert!((options.temperature - 0.7).abs() < f32::EPSILON);
    }
}
