//! The research run flow: clarifying questions, progress output, execution.

use std::sync::Arc;

use delver_core::{
    CompletionOptions, DelverConfig, LlmBackend, MarkdownReportWriter, ProgressSink,
    ProgressUpdate, ResearchRequest, Researcher,
};
use dialoguer::Input;
use tracing::warn;

/// Progress sink that prints one status line per event.
struct ConsoleProgress {
    quiet: bool,
}

impl ProgressSink for ConsoleProgress {
    fn update(&self, update: ProgressUpdate) {
        if self.quiet {
            return;
        }
        let detail = update
            .detail
            .map(|detail| format!(" - {}", detail))
            .unwrap_or_default();
        println!(
            "\x1b[90m  [{:>3.0}%]\x1b[0m {}{}",
            update.overall_percent,
            update.phase.label(),
            detail
        );
    }
}

/// Run one research request end to end and print the outcome.
pub async fn run_research(
    topic: Option<String>,
    config: DelverConfig,
    skip_questions: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let topic = match topic {
        Some(topic) => topic,
        None => Input::<String>::new()
            .with_prompt("Research topic")
            .interact_text()?,
    };

    let llm = delver_core::create_llm_provider(&config.llm)
        .map_err(|e| anyhow::anyhow!("LLM provider unavailable: {}", e))?;
    let search = delver_core::create_search_provider(&config.search)
        .map_err(|e| anyhow::anyhow!("Search provider unavailable: {}", e))?;

    let writer = Arc::new(MarkdownReportWriter::new(&config.report.output_dir));
    let options = CompletionOptions {
        max_output_tokens: config.llm.max_output_tokens,
        temperature: config.llm.temperature,
    };
    // Local servers run unpaced; hosted backends keep their per-minute budget.
    let llm_rpm = match config.llm.backend {
        LlmBackend::LmStudio => 0,
        LlmBackend::OpenRouter => config.llm.requests_per_minute,
    };

    let mut researcher = Researcher::new(llm, search, config.research.clone())
        .with_completion_options(options)
        .with_rate_limits(llm_rpm, config.search.requests_per_minute)
        .with_progress(Arc::new(ConsoleProgress { quiet }))
        .with_report_sink(writer);

    let mut request = ResearchRequest::new(&topic)
        .with_breadth(config.research.breadth)
        .with_depth(config.research.depth);

    if !skip_questions {
        match researcher.clarifying_questions(&topic).await {
            Ok(questions) => {
                println!("\nA few questions to focus the research (enter to skip):");
                for question in questions {
                    let answer: String = Input::new()
                        .with_prompt(format!("  {}", question))
                        .allow_empty(true)
                        .interact_text()?;
                    if !answer.trim().is_empty() {
                        request = request.with_answer(question, answer.trim());
                    }
                }
            }
            Err(e) => warn!(error = %e, "clarifying questions unavailable, continuing"),
        }
    }

    // Ctrl-c cancels the run instead of killing the process.
    let token = researcher.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    println!("\nResearching \x1b[1m{}\x1b[0m\n", topic);
    match researcher.run(request).await {
        Ok(data) => {
            println!("\n\x1b[32mDone.\x1b[0m {}", data.title);
            println!(
                "  {} sections, report saved under {}",
                data.sections.len(),
                config.report.output_dir.display()
            );
            Ok(())
        }
        Err(e) if e.is_cancellation() => {
            println!("\n\x1b[33mResearch cancelled.\x1b[0m");
            Ok(())
        }
        Err(e) => {
            eprintln!("\x1b[31mError: {}\x1b[0m", e);
            std::process::exit(1);
        }
    }
}
