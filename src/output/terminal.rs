// Colored terminal output for topics, artifacts and run summaries.
//
// main.rs display code delegates here so the subcommands print alike.

use colored::Colorize;

use super::{ArtifactOutcome, ArtifactReport};
use crate::extract::ExtractedRecord;
use crate::pipeline::RunSummary;
use crate::topics::{Topic, NOISE_TOPIC};

/// Print topics with their top keywords.
pub fn display_topics(label: &str, model: &str, topics: &[Topic], unassigned: usize, max_words: usize) {
    println!(
        "\n{}",
        format!("=== {label}: {} topics ({model}) ===", topics.len()).bold()
    );
    if topics.is_empty() {
        println!("  No topics found.");
    }
    for topic in topics {
        println!(
            "  {:>3}  {:>4} docs  {}",
            topic.id.to_string().cyan(),
            topic.size,
            topic.label(max_words)
        );
    }
    if unassigned > 0 {
        println!(
            "  {:>3}  {:>4} docs  {}",
            NOISE_TOPIC.to_string().dimmed(),
            unassigned,
            "unassigned".dimmed()
        );
    }
}

/// Print every artifact outcome of a report.
pub fn display_artifacts(report: &ArtifactReport) {
    for (name, outcome) in &report.entries {
        match outcome {
            ArtifactOutcome::Written(path) => {
                println!("  {} {:<22} {}", "+".green(), name, path.display().to_string().dimmed())
            }
            ArtifactOutcome::Skipped(reason) => {
                println!("  {} {:<22} {}", "-".yellow(), name, reason.dimmed())
            }
            ArtifactOutcome::Failed(reason) => {
                println!("  {} {:<22} {}", "!".red().bold(), name, reason.red())
            }
        }
    }
}

/// Print records found by the extractor.
pub fn display_records(records: &[ExtractedRecord]) {
    if records.is_empty() {
        println!("No records found. Check the heading style or try `--name-detection bold`.");
        return;
    }
    println!("\n{}", format!("=== {} records ===", records.len()).bold());
    for record in records {
        println!("  {}", record.name.bold());
        for pair in &record.pairs {
            println!("    {} {}", "Q:".dimmed(), super::truncate_chars(&pair.question, 80));
            println!("    {} {}", "A:".dimmed(), super::truncate_chars(&pair.answer, 120));
        }
    }
}

/// Print the outcome of a whole run.
pub fn display_run_summary(summary: &RunSummary) {
    println!("\n{}", "=== Run summary ===".bold());
    if let Some((updated, appended, discarded)) = summary.merged {
        println!("  Merge: {updated} updated, {appended} appended");
        if discarded > 0 {
            println!(
                "  {} {discarded} Q/A pairs beyond the second were discarded",
                "~".yellow()
            );
        }
    }
    if let Some((translated, already, undetected, failed)) = summary.translated {
        println!(
            "  Translation: {translated} translated, {already} unchanged, {undetected} undetected"
        );
        if failed > 0 {
            println!("  {} {failed} cells kept their original text", "!".bright_red());
        }
    }

    for run in &summary.runs {
        println!(
            "  {:<28} {:>4} docs  {:>3} topics  {:>3} unassigned",
            run.label,
            run.documents,
            run.topics.len(),
            run.unassigned
        );
    }
    for (segment, reason) in &summary.skipped {
        println!("  {} {segment}: {}", "-".yellow(), reason.dimmed());
    }

    let failures = summary.failures();
    if failures > 0 {
        println!("\n  {} {failures} artifacts failed (see log)", "!!".red().bold());
    } else {
        println!("\n  {} Results in {}", "ok".green(), summary.out_dir.display());
    }
}
