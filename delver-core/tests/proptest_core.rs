//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use delver_core::research::chunker::TextChunker;
use delver_core::research::learnings::LearningStore;
use delver_core::research::parse;
use delver_core::research::progress::{ProgressUpdate, ResearchPhase};

/// Strategy for a plausible document: paragraphs of short sentences,
/// paragraphs separated by blank lines.
fn document() -> impl Strategy<Value = String> {
    let word = "[a-z]{1,8}";
    let sentence = prop::collection::vec(word, 1..10)
        .prop_map(|words| format!("{}.", words.join(" ")));
    let paragraph = prop::collection::vec(sentence, 1..5)
        .prop_map(|sentences| sentences.join(" "));
    prop::collection::vec(paragraph, 1..5).prop_map(|paragraphs| paragraphs.join("\n\n"))
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

// --- Chunker properties ---

proptest! {
    #[test]
    fn chunker_respects_budget_for_splittable_text(
        text in document(),
        max_chars in 100usize..300,
    ) {
        // Generated sentences stay under 100 chars, so every chunk has a
        // split point available and must fit the budget.
        let chunks = TextChunker::new(max_chars).chunk(&text);
        for chunk in &chunks {
            prop_assert!(
                chunk.chars().count() <= max_chars,
                "chunk of {} chars exceeds budget {}",
                chunk.chars().count(),
                max_chars
            );
        }
    }

    #[test]
    fn chunker_preserves_content_in_order(
        text in document(),
        max_chars in 20usize..300,
    ) {
        let chunks = TextChunker::new(max_chars).chunk(&text);
        prop_assert_eq!(strip_whitespace(&chunks.concat()), strip_whitespace(&text));
    }

    #[test]
    fn chunker_never_emits_empty_chunks(
        text in document(),
        max_chars in 10usize..200,
    ) {
        for chunk in TextChunker::new(max_chars).chunk(&text) {
            prop_assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn chunker_passes_fitting_input_through(text in document()) {
        let budget = text.chars().count();
        let chunks = TextChunker::new(budget).chunk(&text);
        prop_assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn chunker_emits_unsplittable_overflow_whole(
        word in "[a-z]{50,120}",
        max_chars in 10usize..40,
    ) {
        // No sentence boundary to split on: the oversized unit comes out
        // as one over-budget chunk rather than being truncated.
        let chunks = TextChunker::new(max_chars).chunk(&word);
        prop_assert_eq!(chunks, vec![word]);
    }
}

// --- Response parsing properties ---

proptest! {
    #[test]
    fn parse_string_array_never_panics(raw in ".*") {
        let _ = parse::parse_string_array(&raw, "anything");
    }

    #[test]
    fn parse_graded_learnings_never_panics(raw in ".*") {
        let _ = parse::parse_graded_learnings(&raw);
    }

    #[test]
    fn parse_string_array_round_trips_valid_arrays(
        items in prop::collection::vec("[a-z]{1,12}( [a-z]{1,12}){0,3}", 1..8),
    ) {
        let raw = serde_json::to_string(&items).unwrap();
        let parsed = parse::parse_string_array(&raw, "test array").unwrap();
        prop_assert_eq!(parsed, items);
    }

    #[test]
    fn parse_string_array_ignores_code_fences(
        items in prop::collection::vec("[a-z]{1,12}", 1..6),
    ) {
        let json = serde_json::to_string(&items).unwrap();
        let fenced = format!("```json\n{}\n```", json);
        let parsed = parse::parse_string_array(&fenced, "test array").unwrap();
        prop_assert_eq!(parsed, items);
    }

    #[test]
    fn parse_string_array_ignores_leading_think_block(
        items in prop::collection::vec("[a-z]{1,12}", 1..6),
        thought in "[a-zA-Z ]{0,40}",
    ) {
        let json = serde_json::to_string(&items).unwrap();
        let raw = format!("<think>{}</think>\n{}", thought, json);
        let parsed = parse::parse_string_array(&raw, "test array").unwrap();
        prop_assert_eq!(parsed, items);
    }

    #[test]
    fn parse_text_trims_and_keeps_content(raw in "[a-zA-Z][a-zA-Z0-9 .,]{0,60}") {
        let parsed = parse::parse_text(&raw, "plain text").unwrap();
        prop_assert_eq!(parsed, raw.trim());
    }

    #[test]
    fn parse_text_rejects_blank_input(raw in "\\s*") {
        prop_assert!(parse::parse_text(&raw, "plain text").is_err());
    }
}

// --- Progress percent properties ---

const PHASES: [ResearchPhase; 9] = [
    ResearchPhase::GeneratingSections,
    ResearchPhase::GeneratingTitle,
    ResearchPhase::GeneratingIntroduction,
    ResearchPhase::GeneratingQueries,
    ResearchPhase::SearchingWeb,
    ResearchPhase::ExtractingLearnings,
    ResearchPhase::AnalyzingGaps,
    ResearchPhase::SynthesizingSections,
    ResearchPhase::GeneratingConclusion,
];

proptest! {
    #[test]
    fn progress_percent_stays_in_phase_band(
        phase_idx in 0usize..PHASES.len(),
        current in 0usize..100,
        total in 0usize..20,
    ) {
        let phase = PHASES[phase_idx];
        let (lo, hi) = phase.weight_range();
        let update = ProgressUpdate::new(phase, current, total);
        prop_assert!(update.overall_percent >= lo);
        prop_assert!(update.overall_percent <= hi);
        prop_assert!((0.0..=100.0).contains(&update.overall_percent));
    }

    #[test]
    fn progress_percent_is_monotonic_within_a_phase(
        phase_idx in 0usize..PHASES.len(),
        a in 0usize..50,
        b in 0usize..50,
        total in 1usize..50,
    ) {
        let phase = PHASES[phase_idx];
        let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
        let first = ProgressUpdate::new(phase, earlier, total);
        let second = ProgressUpdate::new(phase, later, total);
        prop_assert!(first.overall_percent <= second.overall_percent);
    }
}

// --- Learning store properties ---

proptest! {
    #[test]
    fn learning_store_totals_match_appends(
        ops in prop::collection::vec(
            (0usize..3, prop::collection::vec("[a-z]{1,10}", 0..4)),
            0..12,
        ),
    ) {
        let sections = ["Overview", "Costs", "Outlook"];
        let mut store = LearningStore::new();
        let mut expected: Vec<Vec<String>> = vec![Vec::new(); sections.len()];

        for (idx, learnings) in &ops {
            store.append(sections[*idx], learnings.clone());
            expected[*idx].extend(learnings.iter().cloned());
        }

        let total: usize = expected.iter().map(Vec::len).sum();
        prop_assert_eq!(store.total(), total);
        prop_assert_eq!(store.all_learnings().len(), total);

        for (idx, section) in sections.iter().enumerate() {
            prop_assert_eq!(store.learnings_for(section), expected[idx].as_slice());
            prop_assert_eq!(store.has_learnings(section), !expected[idx].is_empty());
        }
    }
}
