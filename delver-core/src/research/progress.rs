//! Progress reporting for the research pipeline.
//!
//! Each phase owns a fixed slice of the 0..100 range; the overall percent
//! interpolates `current/total` inside that slice. The weights are a lookup
//! table, deliberately independent of breadth and depth, so two runs with
//! different fan-out still render comparable progress bars.

use serde::Serialize;

/// The phases the pipeline moves through, in execution order.
///
/// Research sub-phases (queries, searches, extraction) share one weight
/// band and advance it by completed section count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResearchPhase {
    #[serde(rename = "Generating Sections")]
    GeneratingSections,
    #[serde(rename = "Generating Title")]
    GeneratingTitle,
    #[serde(rename = "Generating Introduction")]
    GeneratingIntroduction,
    #[serde(rename = "Generating Search Queries")]
    GeneratingQueries,
    #[serde(rename = "Searching Web")]
    SearchingWeb,
    #[serde(rename = "Extracting Learnings")]
    ExtractingLearnings,
    #[serde(rename = "Analyzing Gaps")]
    AnalyzingGaps,
    #[serde(rename = "Synthesizing Sections")]
    SynthesizingSections,
    #[serde(rename = "Generating Conclusion")]
    GeneratingConclusion,
}

impl ResearchPhase {
    /// Human-readable label, also used as the stable wire name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GeneratingSections => "Generating Sections",
            Self::GeneratingTitle => "Generating Title",
            Self::GeneratingIntroduction => "Generating Introduction",
            Self::GeneratingQueries => "Generating Search Queries",
            Self::SearchingWeb => "Searching Web",
            Self::ExtractingLearnings => "Extracting Learnings",
            Self::AnalyzingGaps => "Analyzing Gaps",
            Self::SynthesizingSections => "Synthesizing Sections",
            Self::GeneratingConclusion => "Generating Conclusion",
        }
    }

    /// The (start, end) percent band this phase occupies.
    pub fn weight_range(&self) -> (f32, f32) {
        match self {
            Self::GeneratingSections => (0.0, 15.0),
            Self::GeneratingTitle => (15.0, 25.0),
            Self::GeneratingIntroduction => (25.0, 35.0),
            Self::GeneratingQueries | Self::SearchingWeb | Self::ExtractingLearnings => {
                (35.0, 60.0)
            }
            Self::AnalyzingGaps => (60.0, 80.0),
            Self::SynthesizingSections => (80.0, 90.0),
            Self::GeneratingConclusion => (90.0, 100.0),
        }
    }
}

impl std::fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub phase: ResearchPhase,
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Best-effort overall completion in [0, 100].
    pub overall_percent: f32,
}

impl ProgressUpdate {
    pub fn new(phase: ResearchPhase, current: usize, total: usize) -> Self {
        let (start, end) = phase.weight_range();
        let fraction = if total == 0 {
            0.0
        } else {
            (current as f32 / total as f32).clamp(0.0, 1.0)
        };
        let overall_percent = (start + (end - start) * fraction).clamp(0.0, 100.0);
        Self {
            phase,
            current,
            total,
            detail: None,
            overall_percent,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// One-way sink for progress events.
///
/// Implementations must return promptly; the pipeline calls this inline
/// between suspension points and never waits on it.
pub trait ProgressSink: Send + Sync {
    fn update(&self, update: ProgressUpdate);
}

/// Sink that discards every event.
pub struct NoOpProgressSink;

impl ProgressSink for NoOpProgressSink {
    fn update(&self, _update: ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        assert_eq!(ResearchPhase::GeneratingSections.label(), "Generating Sections");
        assert_eq!(ResearchPhase::SearchingWeb.label(), "Searching Web");
        assert_eq!(
            ResearchPhase::GeneratingConclusion.label(),
            "Generating Conclusion"
        );
        assert_eq!(
            ResearchPhase::GeneratingConclusion.to_string(),
            "Generating Conclusion"
        );
    }

    #[test]
    fn test_percent_interpolates_within_band() {
        let start = ProgressUpdate::new(ResearchPhase::GeneratingSections, 0, 1);
        assert_eq!(start.overall_percent, 0.0);

        let done = ProgressUpdate::new(ResearchPhase::GeneratingSections, 1, 1);
        assert_eq!(done.overall_percent, 15.0);

        let mid = ProgressUpdate::new(ResearchPhase::AnalyzingGaps, 1, 2);
        assert_eq!(mid.overall_percent, 70.0);
    }

    #[test]
    fn test_research_subphases_share_a_band() {
        assert_eq!(
            ResearchPhase::GeneratingQueries.weight_range(),
            ResearchPhase::ExtractingLearnings.weight_range()
        );
        assert_eq!(ResearchPhase::SearchingWeb.weight_range(), (35.0, 60.0));
    }

    #[test]
    fn test_zero_total_stays_at_band_start() {
        let update = ProgressUpdate::new(ResearchPhase::SynthesizingSections, 0, 0);
        assert_eq!(update.overall_percent, 80.0);
    }

    #[test]
    fn test_overshoot_is_clamped_to_band_end() {
        let update = ProgressUpdate::new(ResearchPhase::GeneratingTitle, 5, 2);
        assert_eq!(update.overall_percent, 25.0);
    }

    #[test]
    fn test_phase_sequence_is_monotonic() {
        let sequence = [
            ProgressUpdate::new(ResearchPhase::GeneratingSections, 1, 1),
            ProgressUpdate::new(ResearchPhase::GeneratingTitle, 1, 1),
            ProgressUpdate::new(ResearchPhase::GeneratingIntroduction, 1, 1),
            ProgressUpdate::new(ResearchPhase::ExtractingLearnings, 2, 2),
            ProgressUpdate::new(ResearchPhase::AnalyzingGaps, 2, 2),
            ProgressUpdate::new(ResearchPhase::SynthesizingSections, 2, 2),
            ProgressUpdate::new(ResearchPhase::GeneratingConclusion, 1, 1),
        ];
        for pair in sequence.windows(2) {
            assert!(pair[0].overall_percent <= pair[1].overall_percent);
        }
        assert_eq!(sequence.last().unwrap().overall_percent, 100.0);
    }

    #[test]
    fn test_detail_attaches() {
        let update = ProgressUpdate::new(ResearchPhase::SearchingWeb, 1, 4)
            .with_detail("solar capacity growth");
        assert_eq!(update.detail.as_deref(), Some("solar capacity growth"));
    }
}
