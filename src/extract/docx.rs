// .docx paragraph reader built on docx-rs.

use std::path::Path;

use anyhow::{Context, Result};
use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use tracing::warn;

use super::Paragraph;
use crate::error::PipelineError;

/// Read the body paragraphs of a Word document with their style and boldness.
///
/// A missing file is `InputNotFound`. A file that isn't a parseable document
/// yields no paragraphs.
pub fn read_paragraphs(path: &Path) -> Result<Vec<Paragraph>> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound(path.to_path_buf()).into());
    }
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let docx = match docx_rs::read_docx(&bytes) {
        Ok(docx) => docx,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse document, treating as empty");
            return Ok(Vec::new());
        }
    };

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut runs = Vec::new();
            collect_runs(&para.children, &mut runs);

            let text: String = runs.iter().map(|(t, _)| t.as_str()).collect();
            let visible: Vec<_> = runs.iter().filter(|(t, _)| !t.trim().is_empty()).collect();
            let bold = !visible.is_empty() && visible.iter().all(|(_, b)| *b);

            paragraphs.push(Paragraph {
                text,
                style: para.property.style.as_ref().map(|s| s.val.clone()),
                bold,
            });
        }
    }
    Ok(paragraphs)
}

/// Flatten runs (including those inside hyperlinks) into (text, is_bold).
fn collect_runs(children: &[ParagraphChild], out: &mut Vec<(String, bool)>) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                let bold = run.run_property.bold.is_some();
                let text: String = run
                    .children
                    .iter()
                    .filter_map(|rc| match rc {
                        RunChild::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect();
                out.push((text, bold));
            }
            ParagraphChild::Hyperlink(link) => collect_runs(&link.children, out),
            _ => {}
        }
    }
}
