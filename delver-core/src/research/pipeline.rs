//! The research pipeline orchestrator.
//!
//! Drives a fixed sequence of phases over a [`ResearchRequest`]: plan
//! sections, generate title and introduction, research each section
//! (initial queries, then gap-driven refinement rounds), synthesize prose
//! per section, close with a conclusion, and hand the assembled
//! [`ResearchData`] to the report sink.
//!
//! Concurrency follows one rule: fan-out branches never mutate shared
//! state. Sections run in bounded batches and each branch returns its own
//! learning list; the coordinator merges into the run-local store after
//! every join. Cancellation is cooperative, checked at phase starts, loop
//! tops, and after joins.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ResearchConfig;
use crate::error::{DelverError, ResearchError, Result};
use crate::providers::{LlmProvider, RateLimiter, SearchProvider};
use crate::research::chunker::TextChunker;
use crate::research::learnings::LearningStore;
use crate::research::parse;
use crate::research::progress::{NoOpProgressSink, ProgressSink, ProgressUpdate, ResearchPhase};
use crate::research::prompts;
use crate::research::report::ReportSink;
use crate::research::retry::{with_retry, with_retry_or};
use crate::types::{
    CompletionOptions, ResearchData, ResearchRequest, SearchResult, SectionContent,
};

/// Sections researched concurrently per batch.
const SECTION_CONCURRENCY: usize = 2;
/// Search results retained per query after ranking.
const RESULTS_PER_QUERY: usize = 2;
/// Learnings kept per source after grading.
const LEARNINGS_PER_SOURCE: usize = 5;
/// Gap descriptions accepted per refinement round.
const MAX_GAPS: usize = 3;
/// Stand-in text when conclusion generation fails.
const CONCLUSION_FALLBACK: &str = "A conclusion could not be generated for this report.";

/// Orchestrates research runs against an LLM and a web-search provider.
pub struct Researcher {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
    options: CompletionOptions,
    llm_limiter: RateLimiter,
    search_limiter: RateLimiter,
    progress: Arc<dyn ProgressSink>,
    report_sink: Option<Arc<dyn ReportSink>>,
    cancel: CancellationToken,
}

impl Researcher {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            search,
            config,
            options: CompletionOptions::default(),
            llm_limiter: RateLimiter::per_minute(0),
            search_limiter: RateLimiter::per_minute(0),
            progress: Arc::new(NoOpProgressSink),
            report_sink: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    pub fn with_completion_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Requests-per-minute budgets for the two providers. 0 means unlimited.
    pub fn with_rate_limits(mut self, llm_rpm: u32, search_rpm: u32) -> Self {
        self.llm_limiter = RateLimiter::per_minute(llm_rpm);
        self.search_limiter = RateLimiter::per_minute(search_rpm);
        self
    }

    /// Token that cancels the current run when triggered.
    ///
    /// A run that observes cancellation replaces its token, so callers must
    /// fetch a fresh clone before each run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the current run. Idempotent; the run settles with
    /// [`ResearchError::Cancelled`] at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Generate the clarifying questions asked before research begins.
    pub async fn clarifying_questions(&self, topic: &str) -> Result<Vec<String>> {
        let prompt = prompts::clarifying_questions(topic);
        let prompt = prompt.as_str();
        with_retry(&self.config.retry, || async move {
            let raw = self.complete(prompt).await?;
            let questions =
                parse::parse_string_array(&raw, "JSON array of clarifying questions")?;
            if questions.len() != prompts::CLARIFYING_QUESTION_COUNT {
                return Err(ResearchError::InvalidResponse {
                    expected: format!(
                        "exactly {} clarifying questions",
                        prompts::CLARIFYING_QUESTION_COUNT
                    ),
                    message: format!("got {}", questions.len()),
                }
                .into());
            }
            Ok(questions)
        })
        .await
    }

    /// Run the full pipeline for one request.
    ///
    /// Returns the completed data, a typed fatal error, or
    /// [`ResearchError::Cancelled`]. A cancelled run resets its token so
    /// the next run starts clean.
    pub async fn run(&mut self, request: ResearchRequest) -> Result<ResearchData> {
        request.validate()?;
        info!(
            topic = %request.topic,
            breadth = request.breadth,
            depth = request.depth,
            "starting research run"
        );

        let result = self.execute(&request).await;
        match &result {
            Ok(data) => info!(
                title = %data.title,
                sections = data.sections.len(),
                "research run complete"
            ),
            Err(err) if err.is_cancellation() => {
                info!(topic = %request.topic, "research run cancelled");
                self.cancel = CancellationToken::new();
            }
            Err(err) => warn!(error = %err, "research run failed"),
        }
        result
    }

    async fn execute(&self, request: &ResearchRequest) -> Result<ResearchData> {
        self.ensure_active()?;

        self.emit(ResearchPhase::GeneratingSections, 0, 1);
        let sections = self.plan_sections(request).await?;
        self.emit(ResearchPhase::GeneratingSections, 1, 1);

        self.ensure_active()?;
        self.emit(ResearchPhase::GeneratingTitle, 0, 1);
        let title = self
            .request_text(&prompts::title(&request.topic, &sections), "report title")
            .await?;
        self.emit(ResearchPhase::GeneratingTitle, 1, 1);

        self.ensure_active()?;
        self.emit(ResearchPhase::GeneratingIntroduction, 0, 1);
        let introduction = self
            .request_text(
                &prompts::introduction(&request.topic, &sections),
                "report introduction",
            )
            .await?;
        self.emit(ResearchPhase::GeneratingIntroduction, 1, 1);

        let mut store = LearningStore::new();
        let total = sections.len();
        let mut completed = 0usize;

        for batch in sections.chunks(SECTION_CONCURRENCY) {
            self.ensure_active()?;
            let branches: Vec<_> = batch
                .iter()
                .map(|section| self.research_section(request, section, completed, total))
                .collect();
            let results = join_all(branches).await;
            self.ensure_active()?;

            for (section, result) in batch.iter().zip(results) {
                store.append(section, result?);
            }
            completed += batch.len();
            self.emit(ResearchPhase::ExtractingLearnings, completed, total);
        }

        self.ensure_active()?;
        self.emit(ResearchPhase::SynthesizingSections, 0, total);
        let branches: Vec<_> = sections
            .iter()
            .map(|section| {
                let learnings = store.learnings_for(section).to_vec();
                async move {
                    let content = self
                        .synthesize_section(&request.topic, section, &learnings)
                        .await?;
                    Ok::<_, DelverError>(SectionContent {
                        section: section.clone(),
                        content,
                    })
                }
            })
            .collect();
        let results = join_all(branches).await;
        self.ensure_active()?;

        let mut section_content = Vec::with_capacity(total);
        for result in results {
            section_content.push(result?);
        }
        self.emit(ResearchPhase::SynthesizingSections, total, total);

        self.ensure_active()?;
        self.emit(ResearchPhase::GeneratingConclusion, 0, 1);
        let prompt = prompts::conclusion(&request.topic, &title, &store.all_learnings());
        let prompt = prompt.as_str();
        let conclusion = with_retry_or(
            &self.config.retry,
            CONCLUSION_FALLBACK.to_string(),
            || async move {
                let raw = self.complete(prompt).await?;
                Ok(parse::parse_text(&raw, "report conclusion")?)
            },
        )
        .await;
        self.emit(ResearchPhase::GeneratingConclusion, 1, 1);

        let data = ResearchData {
            topic: request.topic.clone(),
            title,
            introduction,
            sections,
            section_content,
            conclusion,
            depth: request.depth,
        };

        if let Some(sink) = &self.report_sink {
            match sink.persist(&data) {
                Ok(path) => info!(path = %path.display(), "report persisted"),
                Err(err) => warn!(error = %err, "report persistence failed"),
            }
        }

        Ok(data)
    }

    /// Plan the report's sections from topic and clarifying answers.
    async fn plan_sections(&self, request: &ResearchRequest) -> Result<Vec<String>> {
        let prompt =
            prompts::sections(&request.topic, &request.clarifying_answers, request.breadth);
        let sections = self
            .request_non_empty_array(&prompt, "JSON array of section names")
            .await?;
        info!(count = sections.len(), "sections planned");
        Ok(sections)
    }

    /// Research one section: initial search round, then gap refinement.
    ///
    /// Returns every learning the section accumulated. `done`/`total` are
    /// the coordinator's completed-section snapshot for progress events.
    async fn research_section(
        &self,
        request: &ResearchRequest,
        section: &str,
        done: usize,
        total: usize,
    ) -> Result<Vec<String>> {
        self.ensure_active()?;
        self.emit_detail(
            ResearchPhase::GeneratingQueries,
            done,
            total,
            format!("For section: {section}"),
        );

        let queries = self.generate_queries(request, section).await?;
        let mut learnings = self
            .run_search_round(section, &queries, request.breadth, Some((done, total)))
            .await?;

        for round in 1..=request.depth {
            self.ensure_active()?;
            let gaps = self.identify_gaps(request, section, &learnings).await?;
            if gaps.is_empty() {
                debug!(section, round, "no gaps reported, stopping refinement");
                break;
            }

            let gap_queries = self.generate_gap_queries(request, section, &gaps).await?;
            if gap_queries.is_empty() {
                debug!(section, round, "no queries for gaps, stopping refinement");
                break;
            }

            let fresh = self
                .run_search_round(section, &gap_queries, request.breadth, None)
                .await?;
            learnings.extend(fresh);
            self.emit_detail(
                ResearchPhase::AnalyzingGaps,
                round,
                request.depth,
                format!("Refining: {section}"),
            );
        }

        if learnings.is_empty() {
            return Err(ResearchError::EmptySection {
                section: section.to_string(),
            }
            .into());
        }
        debug!(section, count = learnings.len(), "section research complete");
        Ok(learnings)
    }

    /// One search round: issue all queries concurrently, rank and cap the
    /// results, then extract learnings source by source.
    async fn run_search_round(
        &self,
        section: &str,
        queries: &[String],
        max_results: usize,
        progress: Option<(usize, usize)>,
    ) -> Result<Vec<String>> {
        self.ensure_active()?;
        let searches: Vec<_> = queries
            .iter()
            .map(|query| self.search_paced(query, max_results))
            .collect();
        let per_query = join_all(searches).await;
        self.ensure_active()?;

        let mut retained = Vec::new();
        for results in per_query {
            retained.extend(select_top_results(results?, RESULTS_PER_QUERY));
        }
        if let Some((done, total)) = progress {
            self.emit_detail(
                ResearchPhase::SearchingWeb,
                done,
                total,
                format!("Researching: {section}"),
            );
        }
        debug!(
            section,
            queries = queries.len(),
            sources = retained.len(),
            "search round complete"
        );

        let mut learnings = Vec::new();
        for source in &retained {
            self.ensure_active()?;
            learnings.extend(self.extract_learnings(section, source).await);
        }
        if let Some((done, total)) = progress {
            self.emit_detail(
                ResearchPhase::ExtractingLearnings,
                done,
                total,
                format!("Learning from: {section}"),
            );
        }
        Ok(learnings)
    }

    /// Extract graded learnings from one source, chunk by chunk.
    ///
    /// Failures are absorbed per chunk; a bad source contributes nothing
    /// rather than failing the section.
    async fn extract_learnings(&self, section: &str, source: &SearchResult) -> Vec<String> {
        let Some(content) = source.content.as_deref() else {
            return Vec::new();
        };

        let chunker = TextChunker::for_token_allowance(self.config.max_chunk_tokens);
        let chunks = chunker.chunk(content);
        debug!(url = %source.url, chunks = chunks.len(), "extracting learnings");

        let mut graded = Vec::new();
        for chunk in &chunks {
            if self.cancel.is_cancelled() {
                break;
            }
            let prompt = prompts::learnings(section, &source.url, chunk);
            let prompt = prompt.as_str();
            let extracted = with_retry_or(&self.config.retry, Vec::new(), || async move {
                let raw = self.complete(prompt).await?;
                Ok(parse::parse_graded_learnings(&raw)?)
            })
            .await;
            graded.extend(extracted);
        }

        graded.sort_by(|a, b| b.grade.partial_cmp(&a.grade).unwrap_or(Ordering::Equal));
        graded.truncate(LEARNINGS_PER_SOURCE);
        graded.into_iter().map(|g| g.learning).collect()
    }

    /// Generate the initial search queries for a section.
    async fn generate_queries(
        &self,
        request: &ResearchRequest,
        section: &str,
    ) -> Result<Vec<String>> {
        let prompt = prompts::queries(&request.topic, section, request.breadth);
        let mut queries = self
            .request_non_empty_array(&prompt, "JSON array of search queries")
            .await?;
        queries.truncate(request.breadth);
        Ok(queries)
    }

    /// Ask which knowledge gaps remain for a section. An empty list is the
    /// signal to stop refining.
    async fn identify_gaps(
        &self,
        request: &ResearchRequest,
        section: &str,
        learnings: &[String],
    ) -> Result<Vec<String>> {
        let prompt = prompts::gaps(&request.topic, section, learnings, MAX_GAPS);
        let mut gaps = self
            .request_string_array(&prompt, "JSON array of knowledge gaps")
            .await?;
        gaps.truncate(MAX_GAPS);
        Ok(gaps)
    }

    /// Generate queries aimed at the given gaps.
    async fn generate_gap_queries(
        &self,
        request: &ResearchRequest,
        section: &str,
        gaps: &[String],
    ) -> Result<Vec<String>> {
        let prompt = prompts::gap_queries(&request.topic, section, gaps, request.breadth);
        let mut queries = self
            .request_string_array(&prompt, "JSON array of search queries")
            .await?;
        queries.truncate(request.breadth);
        Ok(queries)
    }

    /// Synthesize a section's prose from its learnings.
    ///
    /// A section that cannot be synthesized after retries fails the run;
    /// the report never silently omits a planned section.
    async fn synthesize_section(
        &self,
        topic: &str,
        section: &str,
        learnings: &[String],
    ) -> Result<String> {
        let prompt = prompts::synthesis(topic, section, learnings);
        self.request_text(&prompt, "section prose")
            .await
            .map_err(|err| match err {
                DelverError::Research(ResearchError::InvalidResponse { .. }) => {
                    DelverError::Research(ResearchError::EmptySection {
                        section: section.to_string(),
                    })
                }
                other => other,
            })
    }

    async fn request_string_array(
        &self,
        prompt: &str,
        expected: &'static str,
    ) -> Result<Vec<String>> {
        with_retry(&self.config.retry, || async move {
            let raw = self.complete(prompt).await?;
            Ok(parse::parse_string_array(&raw, expected)?)
        })
        .await
    }

    /// Like [`Self::request_string_array`], but an empty list is itself a
    /// format violation and gets retried.
    async fn request_non_empty_array(
        &self,
        prompt: &str,
        expected: &'static str,
    ) -> Result<Vec<String>> {
        with_retry(&self.config.retry, || async move {
            let raw = self.complete(prompt).await?;
            let items = parse::parse_string_array(&raw, expected)?;
            if items.is_empty() {
                return Err(ResearchError::InvalidResponse {
                    expected: expected.to_string(),
                    message: "response was an empty list".to_string(),
                }
                .into());
            }
            Ok(items)
        })
        .await
    }

    async fn request_text(&self, prompt: &str, expected: &'static str) -> Result<String> {
        with_retry(&self.config.retry, || async move {
            let raw = self.complete(prompt).await?;
            Ok(parse::parse_text(&raw, expected)?)
        })
        .await
    }

    /// One rate-limited completion request.
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.llm_limiter.acquire().await;
        let response = self
            .llm
            .complete(prompt, prompts::SYSTEM_PROMPT, &self.options)
            .await?;
        Ok(response)
    }

    /// One rate-limited search request. Search failures surface unretried.
    async fn search_paced(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        self.search_limiter.acquire().await;
        debug!(query, "searching");
        Ok(self.search.search(query, max_results).await?)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ResearchError::Cancelled.into());
        }
        Ok(())
    }

    fn emit(&self, phase: ResearchPhase, current: usize, total: usize) {
        self.progress.update(ProgressUpdate::new(phase, current, total));
    }

    fn emit_detail(&self, phase: ResearchPhase, current: usize, total: usize, detail: String) {
        self.progress
            .update(ProgressUpdate::new(phase, current, total).with_detail(detail));
    }
}

/// Keep the usable, best-ranked results: drop entries without content,
/// order by relevance score when present (falling back to content length),
/// and cap the survivors.
fn select_top_results(results: Vec<SearchResult>, cap: usize) -> Vec<SearchResult> {
    let mut usable: Vec<SearchResult> = results.into_iter().filter(|r| r.has_content()).collect();
    usable.sort_by(|a, b| match (a.relevance_score, b.relevance_score) {
        (Some(left), Some(right)) => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let left = a.content.as_deref().map_or(0, str::len);
            let right = b.content.as_deref().map_or(0, str::len);
            right.cmp(&left)
        }
    });
    usable.truncate(cap);
    usable
}
