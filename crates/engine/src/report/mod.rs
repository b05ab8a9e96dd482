//! Session report rendering
//!
//! Renders the terminal `SessionReport` in the format the user asked for.
//! Renderers are pure: report in, string out, no I/O, so every format is
//! trivially testable and the CLI decides where bytes go.

use crate::apply::{ReportEntry, SessionReport};
use crate::core::DecisionState;
use anyhow::Result;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain-text summary for terminals.
    Rich,
    Markdown,
    Html,
    Json,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            // `interactive` is the historical name of the rich terminal view;
            // kept as an alias so old invocations keep working.
            "rich" | "text" | "interactive" => Ok(Self::Rich),
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown report format: {other}"),
        }
    }
}

pub trait Renderer {
    fn render(&self, report: &SessionReport) -> Result<String>;
}

pub fn renderer_for(format: ReportFormat) -> Box<dyn Renderer> {
    match format {
        ReportFormat::Rich => Box::new(RichRenderer),
        ReportFormat::Markdown => Box::new(MarkdownRenderer),
        ReportFormat::Html => Box::new(HtmlRenderer),
        ReportFormat::Json => Box::new(JsonRenderer),
    }
}

struct RichRenderer;

impl Renderer for RichRenderer {
    fn render(&self, report: &SessionReport) -> Result<String> {
        let mut out = String::new();
        let counts = &report.counts;

        out.push_str("Review session summary\n");
        out.push_str(&format!(
            "  applied {} | failed {} | rejected {} | deferred {} | undone {} | pending {}\n",
            counts.applied,
            counts.failed,
            counts.rejected,
            counts.deferred,
            counts.undone,
            counts.pending
        ));
        out.push_str(&format!(
            "  merge: {} raw findings -> {} issues ({:.1}% reduction)\n",
            report.merge_stats.input_count,
            report.merge_stats.merged_count,
            report.merge_stats.reduction_percentage()
        ));

        for entry in &report.entries {
            out.push_str(&format!(
                "  {} {} {}:{} [{}] {}\n",
                entry.severity.glyph(),
                entry.issue_id,
                entry.file.display(),
                entry.line_start,
                state_label(entry.state),
                entry.message
            ));
            if let Some(reason) = &entry.reason {
                out.push_str(&format!("      reason: {reason}\n"));
            }
        }

        if !report.warnings.is_empty() {
            out.push_str("Analyzer warnings:\n");
            for warning in &report.warnings {
                out.push_str(&format!(
                    "  {} on {}: {}\n",
                    warning.tool,
                    warning.file.display(),
                    warning.reason
                ));
            }
        }

        Ok(out)
    }
}

struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, report: &SessionReport) -> Result<String> {
        let mut out = String::new();

        out.push_str("# Code Review Report\n\n");
        out.push_str(&format!(
            "**Generated**: {}\n\n",
            report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        out.push_str("## Summary\n\n");
        out.push_str(&format!("- **Applied**: {}\n", report.counts.applied));
        out.push_str(&format!("- **Failed**: {}\n", report.counts.failed));
        out.push_str(&format!("- **Rejected**: {}\n", report.counts.rejected));
        out.push_str(&format!("- **Deferred**: {}\n", report.counts.deferred));
        out.push_str(&format!("- **Undone**: {}\n", report.counts.undone));
        out.push_str(&format!("- **Pending**: {}\n\n", report.counts.pending));

        out.push_str(&format!(
            "**Merge**: {} raw findings collapsed into {} issues ({:.1}% reduction)\n\n",
            report.merge_stats.input_count,
            report.merge_stats.merged_count,
            report.merge_stats.reduction_percentage()
        ));

        if !report.entries.is_empty() {
            out.push_str("## Issues\n\n");
            out.push_str("| # | Severity | Location | Tools | Outcome | Message |\n");
            out.push_str("|---|----------|----------|-------|---------|----------|\n");
            for (idx, entry) in report.entries.iter().enumerate() {
                out.push_str(&format!(
                    "| {} | {} {:?} | `{}:{}` | {} | {} | {} |\n",
                    idx + 1,
                    entry.severity.glyph(),
                    entry.severity,
                    entry.file.display(),
                    entry.line_start,
                    entry.source_tools.join(", "),
                    state_label(entry.state),
                    truncate(&entry.message, 60)
                ));
            }
            out.push('\n');
        }

        let failures: Vec<&ReportEntry> = report.failures().collect();
        if !failures.is_empty() {
            out.push_str("## Apply Failures\n\n");
            for entry in failures {
                out.push_str(&format!(
                    "- **{}** `{}:{}`: {}\n",
                    entry.issue_id,
                    entry.file.display(),
                    entry.line_start,
                    entry.reason.as_deref().unwrap_or("unknown reason")
                ));
            }
            out.push('\n');
        }

        if !report.warnings.is_empty() {
            out.push_str("## Analyzer Warnings\n\n");
            for warning in &report.warnings {
                out.push_str(&format!(
                    "- `{}` on `{}`: {}\n",
                    warning.tool,
                    warning.file.display(),
                    warning.reason
                ));
            }
            out.push('\n');
        }

        Ok(out)
    }
}

struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, report: &SessionReport) -> Result<String> {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        out.push_str("<meta charset=\"utf-8\">\n<title>Code Review Report</title>\n");
        out.push_str("</head>\n<body>\n<h1>Code Review Report</h1>\n");

        out.push_str("<ul>\n");
        out.push_str(&format!("<li>Applied: {}</li>\n", report.counts.applied));
        out.push_str(&format!("<li>Failed: {}</li>\n", report.counts.failed));
        out.push_str(&format!("<li>Rejected: {}</li>\n", report.counts.rejected));
        out.push_str(&format!("<li>Deferred: {}</li>\n", report.counts.deferred));
        out.push_str(&format!("<li>Undone: {}</li>\n", report.counts.undone));
        out.push_str(&format!("<li>Pending: {}</li>\n", report.counts.pending));
        out.push_str("</ul>\n");

        out.push_str("<table border=\"1\">\n");
        out.push_str("<tr><th>Severity</th><th>Location</th><th>Outcome</th><th>Message</th></tr>\n");
        for entry in &report.entries {
            out.push_str(&format!(
                "<tr><td>{:?}</td><td>{}:{}</td><td>{}</td><td>{}</td></tr>\n",
                entry.severity,
                escape_html(&entry.file.display().to_string()),
                entry.line_start,
                state_label(entry.state),
                escape_html(&entry.message)
            ));
        }
        out.push_str("</table>\n</body>\n</html>\n");
        Ok(out)
    }
}

struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, report: &SessionReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

fn state_label(state: DecisionState) -> &'static str {
    match state {
        DecisionState::Pending => "pending",
        DecisionState::Accepted => "accepted",
        DecisionState::Rejected => "rejected",
        DecisionState::Deferred => "deferred",
        DecisionState::Applied => "applied",
        DecisionState::ApplyFailed => "failed",
        DecisionState::Undone => "undone",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MergeStats;
    use crate::apply::DecisionCounts;
    use crate::core::Severity;
    use chrono::Utc;
    use std::path::PathBuf;

    fn sample_report() -> SessionReport {
        SessionReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            counts: DecisionCounts {
                applied: 1,
                failed: 1,
                ..Default::default()
            },
            entries: vec![
                ReportEntry {
                    issue_id: "KZ-0001".into(),
                    file: PathBuf::from("src/app.py"),
                    line_start: 10,
                    severity: Severity::High,
                    source_tools: vec!["ruff".into(), "llm".into()],
                    message: "possible null dereference".into(),
                    state: DecisionState::Applied,
                    reason: None,
                },
                ReportEntry {
                    issue_id: "KZ-0002".into(),
                    file: PathBuf::from("src/app.py"),
                    line_start: 30,
                    severity: Severity::Medium,
                    source_tools: vec!["llm".into()],
                    message: "unchecked <input>".into(),
                    state: DecisionState::ApplyFailed,
                    reason: Some("stale fix".into()),
                },
            ],
            warnings: Vec::new(),
            merge_stats: MergeStats {
                input_count: 4,
                merged_count: 2,
                collapsed_count: 2,
            },
        }
    }

    #[test]
    fn format_parsing_accepts_aliases() {
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert_eq!("RICH".parse::<ReportFormat>().unwrap(), ReportFormat::Rich);
        assert_eq!(
            "interactive".parse::<ReportFormat>().unwrap(),
            ReportFormat::Rich
        );
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn markdown_report_lists_failures_with_reasons() {
        let out = renderer_for(ReportFormat::Markdown)
            .render(&sample_report())
            .unwrap();
        assert!(out.contains("# Code Review Report"));
        assert!(out.contains("## Apply Failures"));
        assert!(out.contains("stale fix"));
        assert!(out.contains("4 raw findings collapsed into 2 issues"));
    }

    #[test]
    fn rich_report_shows_counts_and_states() {
        let out = renderer_for(ReportFormat::Rich)
            .render(&sample_report())
            .unwrap();
        assert!(out.contains("applied 1"));
        assert!(out.contains("failed 1"));
        assert!(out.contains("[applied]"));
        assert!(out.contains("[failed]"));
    }

    #[test]
    fn html_report_escapes_markup_in_messages() {
        let out = renderer_for(ReportFormat::Html)
            .render(&sample_report())
            .unwrap();
        assert!(out.contains("unchecked &lt;input&gt;"));
        assert!(!out.contains("unchecked <input>"));
    }

    #[test]
    fn json_report_round_trips() {
        let out = renderer_for(ReportFormat::Json)
            .render(&sample_report())
            .unwrap();
        let parsed: SessionReport = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.counts.applied, 1);
        assert_eq!(parsed.entries.len(), 2);
    }
}
