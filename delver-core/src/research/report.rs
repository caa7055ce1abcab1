//! Markdown rendering and persistence of finished reports.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::error::ReportError;
use crate::types::ResearchData;

/// Render the final report document.
///
/// Title heading, introduction, each section's content in plan order, then
/// the conclusion under its own heading.
pub fn render_markdown(data: &ResearchData) -> String {
    let mut out = format!("# {}\n\n", data.title);
    out.push_str(&data.introduction);
    out.push_str("\n\n");

    for section in &data.section_content {
        out.push_str(&format!("## {}\n\n", section.section));
        out.push_str(&section.content);
        out.push_str("\n\n");
    }

    out.push_str("## Conclusion\n\n");
    out.push_str(&data.conclusion);
    out.push('\n');
    out
}

/// Destination for finished reports.
///
/// Persistence runs after research has already succeeded; callers treat a
/// failure here as a warning, never as a failure of the run itself.
pub trait ReportSink: Send + Sync {
    fn persist(&self, data: &ResearchData) -> Result<PathBuf, ReportError>;
}

/// Writes each report as a markdown file under a configured directory.
pub struct MarkdownReportWriter {
    output_dir: PathBuf,
}

impl MarkdownReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Date-stamped file name derived from the report title.
    fn file_name(title: &str) -> String {
        let stamp = Local::now().format("%Y-%m-%d");
        format!("{stamp}-{}.md", slugify(title))
    }
}

impl ReportSink for MarkdownReportWriter {
    fn persist(&self, data: &ResearchData) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(Self::file_name(&data.title));
        let rendered = render_markdown(data);
        write_atomic(&path, rendered.as_bytes()).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }
}

/// Write to a `.tmp` sibling, then rename into place.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("md.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Reduce a title to a filesystem-safe slug, capped at 60 characters.
fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= 60 {
            break;
        }
    }

    if slug.is_empty() {
        slug.push_str("report");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionContent;

    fn sample_data() -> ResearchData {
        ResearchData {
            topic: "Solar Energy".into(),
            title: "Solar Energy: Costs and Outlook".into(),
            introduction: "An overview of the field.".into(),
            sections: vec!["Overview".into(), "Costs".into()],
            section_content: vec![
                SectionContent {
                    section: "Overview".into(),
                    content: "Capacity keeps growing.".into(),
                },
                SectionContent {
                    section: "Costs".into(),
                    content: "Prices keep falling.".into(),
                },
            ],
            conclusion: "The trend is clear.".into(),
            depth: 1,
        }
    }

    #[test]
    fn test_render_orders_headings() {
        let rendered = render_markdown(&sample_data());
        assert!(rendered.starts_with("# Solar Energy: Costs and Outlook\n\n"));

        let overview = rendered.find("## Overview").unwrap();
        let costs = rendered.find("## Costs").unwrap();
        let conclusion = rendered.find("## Conclusion").unwrap();
        assert!(overview < costs && costs < conclusion);
        assert!(rendered.contains("Capacity keeps growing."));
        assert!(rendered.trim_end().ends_with("The trend is clear."));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Solar Energy: Costs and Outlook"),
            "solar-energy-costs-and-outlook"
        );
        assert_eq!(slugify("  ...  "), "report");
        assert!(slugify(&"long word ".repeat(30)).len() <= 61);
    }

    #[test]
    fn test_persist_writes_under_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MarkdownReportWriter::new(dir.path());
        let path = writer.persist(&sample_data()).unwrap();

        assert!(path.starts_with(dir.path()));
        assert!(path.extension().is_some_and(|e| e == "md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Conclusion"));
    }

    #[test]
    fn test_persist_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("reports").join("nested");
        let writer = MarkdownReportWriter::new(&nested);
        let path = writer.persist(&sample_data()).unwrap();
        assert!(path.exists());
    }
}
