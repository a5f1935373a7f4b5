// Markdown summary of a pipeline run.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use super::ArtifactOutcome;
use crate::pipeline::RunSummary;

fn outcome_cell(outcome: &ArtifactOutcome) -> String {
    match outcome {
        ArtifactOutcome::Written(path) => format!(
            "written `{}`",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ),
        ArtifactOutcome::Skipped(reason) => format!("skipped: {reason}"),
        ArtifactOutcome::Failed(reason) => format!("**failed**: {}", reason.replace('|', "\\|")),
    }
}

/// Render the run summary as Markdown.
pub fn render_run_summary(summary: &RunSummary) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Topic analysis run\n");
    let _ = writeln!(md, "- Input: `{}`", summary.input.display());
    let _ = writeln!(md, "- Output directory: `{}`", summary.out_dir.display());
    let _ = writeln!(md, "- Strategy: {}", summary.strategy);
    if let Some((updated, appended, discarded)) = summary.merged {
        let _ = writeln!(
            md,
            "- Merge: {updated} updated, {appended} appended, {discarded} Q/A pairs discarded"
        );
    }
    if let Some((translated, already, undetected, failed)) = summary.translated {
        let _ = writeln!(
            md,
            "- Translation: {translated} translated, {already} already in target language, \
             {undetected} undetected, {failed} failed"
        );
    }
    let _ = writeln!(
        md,
        "- Generated: {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(md, "## Segments analysed\n");
    if summary.runs.is_empty() {
        let _ = writeln!(md, "None.\n");
    } else {
        let _ = writeln!(md, "| Segment | Model | Documents | Topics | Unassigned | Failed artifacts |");
        let _ = writeln!(md, "|---|---|---|---|---|---|");
        for run in &summary.runs {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                run.label,
                run.model,
                run.documents,
                run.topics.len(),
                run.unassigned,
                run.report.failures()
            );
        }
        let _ = writeln!(md);
    }

    if !summary.skipped.is_empty() {
        let _ = writeln!(md, "## Skipped\n");
        for (segment, reason) in &summary.skipped {
            let _ = writeln!(md, "- `{segment}`: {reason}");
        }
        let _ = writeln!(md);
    }

    let _ = writeln!(md, "## Artifacts\n");
    let _ = writeln!(md, "| Run | Artifact | Outcome |");
    let _ = writeln!(md, "|---|---|---|");
    for (name, outcome) in &summary.artifacts.entries {
        let _ = writeln!(md, "| run | {name} | {} |", outcome_cell(outcome));
    }
    for run in &summary.runs {
        for (name, outcome) in &run.report.entries {
            let _ = writeln!(md, "| {} | {name} | {} |", run.label, outcome_cell(outcome));
        }
    }
    md
}

/// Write the Markdown summary to `path`.
pub fn write_run_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    std::fs::write(path, render_run_summary(summary))
        .with_context(|| format!("Failed to write run summary {}", path.display()))
}
