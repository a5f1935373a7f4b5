// PDF text extraction and cleanup of the line-wrapped text PDFs produce.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex_lite::Regex;

use crate::error::PipelineError;

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S)-\n(\S)").expect("static regex"));
static WRAPPED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\n])\n([^\n])").expect("static regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("static regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Extract the text of every page of a PDF.
pub fn extract_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()).into());
    }
    pdf_extract::extract_text(path)
        .with_context(|| format!("Failed to extract text from {}", path.display()))
}

/// Undo PDF line wrapping.
///
/// Words hyphenated across a line break are re-joined, wrapped lines are
/// joined, and all runs of whitespace collapse to a single space.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = HYPHEN_BREAK.replace_all(&text, "$1$2");
    let text = WRAPPED_LINE.replace_all(&text, "$1 $2");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = text.replace('\n', " ");
    SPACES.replace_all(&text, " ").trim().to_string()
}

/// Extract a PDF and write its cleaned text to `dest`. Returns the character count.
pub fn convert(path: &Path, dest: &Path) -> Result<usize> {
    let cleaned = clean_text(&extract_text(path)?);
    std::fs::write(dest, &cleaned).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(cleaned.chars().count())
}
