// Output: topic tables, charts, HTML plots, run summaries and terminal display.

pub mod charts;
pub mod html;
pub mod report;
pub mod summary;
pub mod tables;
pub mod terminal;

use std::path::PathBuf;

use serde::Serialize;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Counts characters, not bytes, so accented letters never split.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// What happened to one output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArtifactOutcome {
    Written(PathBuf),
    /// Not produced because its inputs do not apply (e.g. no weight matrix).
    Skipped(String),
    /// Attempted and failed; the rest of the report still went ahead.
    Failed(String),
}

impl ArtifactOutcome {
    pub fn from_result(result: anyhow::Result<PathBuf>) -> Self {
        match result {
            Ok(path) => ArtifactOutcome::Written(path),
            Err(e) => ArtifactOutcome::Failed(format!("{e:#}")),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ArtifactOutcome::Failed(_))
    }
}

/// Outcomes of every artifact in one report, in the order they were attempted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactReport {
    pub entries: Vec<(String, ArtifactOutcome)>,
}

impl ArtifactReport {
    pub fn record(&mut self, name: impl Into<String>, outcome: ArtifactOutcome) {
        let name = name.into();
        if let ArtifactOutcome::Failed(reason) = &outcome {
            tracing::warn!(artifact = %name, error = %reason, "Artifact failed");
        }
        self.entries.push((name, outcome));
    }

    pub fn get(&self, name: &str) -> Option<&ArtifactOutcome> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| o)
    }

    pub fn failures(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_failed()).count()
    }

    pub fn written(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, ArtifactOutcome::Written(_)))
            .count()
    }

    pub fn extend(&mut self, other: ArtifactReport) {
        self.entries.extend(other.entries);
    }
}
