// Document extraction: turn a survey document's paragraphs into Q/A records.
//
// A survey document is a sequence of entity sections. Each section opens with
// the entity's name (a heading paragraph, or a fully bold one) and contains
// the two standard questions, each followed by the respondent's answer.
// Questions are matched fuzzily against known templates because respondents
// edit the question text when they fill the form in.

pub mod docx;
pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First standard survey question.
pub const QUESTION_1: &str = "Pouvez-vous nous apporter un témoignage sur la façon dont votre structure répond, à travers ses modalités de fonctionnement, au contexte actuel et/ou celui de son émergence ?";

/// Second standard survey question.
pub const QUESTION_2: &str = "Pensez-vous que votre espace ou l'espace auquel vous avez participé puisse être considéré comme une œuvre ? Et si oui dans quel sens ?";

/// One paragraph as read from a source document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub text: String,
    /// Paragraph style id, e.g. "Heading1" or "Titre1".
    pub style: Option<String>,
    /// True when every text run in the paragraph is bold.
    pub bold: bool,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Some("Heading1".into()),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// One entity's answers, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub name: String,
    pub pairs: Vec<QaPair>,
}

/// How entity names are recognized in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NameDetection {
    /// Paragraph style starts with one of the heading prefixes.
    Heading,
    /// Every run of the paragraph is bold.
    Bold,
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub name_detection: NameDetection,
    /// Lowercased style-id prefixes that mark a heading.
    pub heading_prefixes: Vec<String>,
    pub question_templates: Vec<String>,
    /// Minimum similarity for a paragraph to count as a question.
    pub similarity_threshold: f64,
    /// Substrings that end an answer (e.g. a website footer).
    pub stop_markers: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            name_detection: NameDetection::Heading,
            heading_prefixes: vec!["heading".into(), "titre".into(), "title".into()],
            question_templates: vec![QUESTION_1.into(), QUESTION_2.into()],
            similarity_threshold: 0.9,
            stop_markers: vec!["www".into()],
        }
    }
}

impl ExtractConfig {
    fn is_name(&self, p: &Paragraph) -> bool {
        match self.name_detection {
            NameDetection::Heading => p.style.as_deref().is_some_and(|style| {
                let style = style.to_lowercase();
                self.heading_prefixes.iter().any(|prefix| style.starts_with(prefix))
            }),
            NameDetection::Bold => p.bold,
        }
    }

    fn matching_question(&self, text: &str) -> Option<&str> {
        self.question_templates
            .iter()
            .map(|t| (t, question_similarity(text, t)))
            .filter(|(_, score)| *score >= self.similarity_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(t, _)| t.as_str())
    }

    fn is_stop(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.stop_markers
            .iter()
            .any(|m| lower.contains(&m.to_lowercase()))
    }
}

enum State {
    SeekingName,
    SeekingQuestion,
    CollectingAnswer { question: String, answer: Vec<String> },
}

/// Record under construction.
struct Section {
    name: String,
    pairs: Vec<QaPair>,
}

impl Section {
    fn finish(self, out: &mut Vec<ExtractedRecord>) {
        if self.pairs.iter().any(|p| !p.answer.is_empty()) {
            out.push(ExtractedRecord {
                name: self.name,
                pairs: self.pairs,
            });
        } else {
            debug!(name = %self.name, "Dropping section without answers");
        }
    }
}

/// Run the extraction state machine over a document's paragraphs.
///
/// A name paragraph always starts a new section, closing the open one.
/// Within a section, a paragraph matching a question template starts that
/// question's answer; following paragraphs are appended (space-joined) until
/// the next question, the next name, or a terminal marker. A terminal marker
/// (a bold paragraph, or text containing a stop marker) closes the answer and
/// waits for the next name. Empty paragraphs are ignored.
pub fn extract_records(paragraphs: &[Paragraph], config: &ExtractConfig) -> Vec<ExtractedRecord> {
    let mut records = Vec::new();
    let mut section: Option<Section> = None;
    let mut state = State::SeekingName;

    for p in paragraphs {
        let text = p.text.trim();
        if text.is_empty() {
            continue;
        }

        if config.is_name(p) {
            close_answer(&mut state, section.as_mut());
            if let Some(done) = section.take() {
                done.finish(&mut records);
            }
            section = Some(Section {
                name: text.to_string(),
                pairs: Vec::new(),
            });
            state = State::SeekingQuestion;
            continue;
        }

        if matches!(state, State::SeekingName) {
            continue;
        }

        if let Some(question) = config.matching_question(text) {
            close_answer(&mut state, section.as_mut());
            state = State::CollectingAnswer {
                question: question.to_string(),
                answer: Vec::new(),
            };
            continue;
        }

        if !matches!(state, State::CollectingAnswer { .. }) {
            continue;
        }
        if p.bold || config.is_stop(text) {
            close_answer(&mut state, section.as_mut());
            state = State::SeekingName;
        } else if let State::CollectingAnswer { answer, .. } = &mut state {
            answer.push(text.to_string());
        }
    }

    close_answer(&mut state, section.as_mut());
    if let Some(done) = section.take() {
        done.finish(&mut records);
    }

    debug!(records = records.len(), "Extracted records");
    records
}

/// If an answer is being collected, move it into the section.
fn close_answer(state: &mut State, section: Option<&mut Section>) {
    let previous = std::mem::replace(state, State::SeekingQuestion);
    match previous {
        State::CollectingAnswer { question, answer } => {
            if let Some(section) = section {
                section.pairs.push(QaPair {
                    question,
                    answer: answer.join(" "),
                });
            }
        }
        other => *state = other,
    }
}

/// Similarity of two question texts in [0, 1], ignoring case, spacing and
/// apostrophe style.
pub fn question_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_question(a), &normalize_question(b))
}

fn normalize_question(text: &str) -> String {
    text.to_lowercase()
        .replace(['\u{2019}', '\u{2018}', '`'], "'")
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a document and extract its records. Unreadable documents yield none.
pub fn extract_file(path: &Path, config: &ExtractConfig) -> Result<Vec<ExtractedRecord>> {
    let paragraphs = docx::read_paragraphs(path)?;
    Ok(extract_records(&paragraphs, config))
}

/// Write records as CSV: name, then question/answer columns per pair.
pub fn write_records_csv(records: &[ExtractedRecord], path: &Path) -> Result<()> {
    let width = records.iter().map(|r| r.pairs.len()).max().unwrap_or(0).max(1);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["name".to_string()];
    for i in 1..=width {
        header.push(format!("question{i}"));
        header.push(format!("answer{i}"));
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.name.clone()];
        for i in 0..width {
            match record.pairs.get(i) {
                Some(pair) => {
                    row.push(pair.question.clone());
                    row.push(pair.answer.clone());
                }
                None => row.extend([String::new(), String::new()]),
            }
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
