//! Strict parsing of collaborator responses.
//!
//! Every request type has exactly one accepted output grammar. Before
//! parsing, two cosmetic wrappers models commonly add are removed: a
//! leading `<think>...</think>` block and a single surrounding code fence.
//! Anything else that deviates from the grammar is an `InvalidResponse`,
//! which the retry policy treats as transient.

use serde::Deserialize;

use crate::error::ResearchError;

/// One extracted learning with the collaborator's own relevance grade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GradedLearning {
    pub learning: String,
    pub grade: f32,
}

/// Strip cosmetic wrappers without touching the payload.
fn normalize(raw: &str) -> &str {
    let mut text = raw.trim();

    if text.starts_with("<think>") {
        if let Some(end) = text.find("</think>") {
            text = text[end + "</think>".len()..].trim_start();
        }
    }

    if text.starts_with("```") {
        let after_fence = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => return text,
        };
        if let Some(stripped) = after_fence.trim_end().strip_suffix("```") {
            text = stripped.trim();
        }
    }

    text
}

/// Parse a JSON array of non-empty strings.
///
/// An empty array is valid; call sites that require entries enforce that
/// themselves (the gap loop reads an empty array as "stop").
pub fn parse_string_array(raw: &str, expected: &str) -> Result<Vec<String>, ResearchError> {
    let normalized = normalize(raw);
    let items: Vec<String> =
        serde_json::from_str(normalized).map_err(|err| ResearchError::InvalidResponse {
            expected: expected.to_string(),
            message: err.to_string(),
        })?;

    let mut cleaned = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            return Err(ResearchError::InvalidResponse {
                expected: expected.to_string(),
                message: "array contains an empty string".to_string(),
            });
        }
        cleaned.push(trimmed.to_string());
    }
    Ok(cleaned)
}

/// Parse a JSON array of `{"learning": string, "grade": number}` objects.
pub fn parse_graded_learnings(raw: &str) -> Result<Vec<GradedLearning>, ResearchError> {
    let normalized = normalize(raw);
    let items: Vec<GradedLearning> =
        serde_json::from_str(normalized).map_err(|err| ResearchError::InvalidResponse {
            expected: "JSON array of {learning, grade} objects".to_string(),
            message: err.to_string(),
        })?;

    for item in &items {
        if item.learning.trim().is_empty() {
            return Err(ResearchError::InvalidResponse {
                expected: "JSON array of {learning, grade} objects".to_string(),
                message: "learning text is empty".to_string(),
            });
        }
    }
    Ok(items)
}

/// Accept free prose; reject responses with no content at all.
pub fn parse_text(raw: &str, expected: &str) -> Result<String, ResearchError> {
    let normalized = normalize(raw).trim();
    if normalized.is_empty() {
        return Err(ResearchError::InvalidResponse {
            expected: expected.to_string(),
            message: "response is empty".to_string(),
        });
    }
    Ok(normalized.to_string())
}
