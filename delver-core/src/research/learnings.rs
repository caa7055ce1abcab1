//! Per-section accumulation of extracted learnings.
//!
//! The store is owned by the run that created it and mutated only by the
//! coordinating task. Concurrent fan-out branches return their own learning
//! lists; the coordinator appends them here after each join, so different
//! sections never contend and no entry is partially written.

use crate::types::SectionLearnings;

/// Append-only log of learnings keyed by section, in first-seen order.
#[derive(Debug, Default)]
pub struct LearningStore {
    entries: Vec<SectionLearnings>,
}

impl LearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append learnings to a section's entry, creating it if absent.
    pub fn append(&mut self, section: &str, learnings: Vec<String>) {
        if learnings.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|e| e.section == section) {
            Some(entry) => entry.learnings.extend(learnings),
            None => self.entries.push(SectionLearnings {
                section: section.to_string(),
                learnings,
            }),
        }
    }

    /// All learnings recorded for one section, in append order.
    pub fn learnings_for(&self, section: &str) -> &[String] {
        self.entries
            .iter()
            .find(|e| e.section == section)
            .map(|e| e.learnings.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a section has accumulated at least one learning.
    pub fn has_learnings(&self, section: &str) -> bool {
        !self.learnings_for(section).is_empty()
    }

    /// The union of every section's learnings, in section order.
    pub fn all_learnings(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| e.learnings.iter().cloned())
            .collect()
    }

    /// Total learning count across all sections.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.learnings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
