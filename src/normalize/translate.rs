// Machine translation to the pivot language.
//
// Translation is delegated to an Ollama-compatible chat endpoint behind the
// Translator trait. The per-cell policy fails open: undetected language,
// text already in the target language, and translator errors all leave the
// cell exactly as it was.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::language::{detect, Language};
use crate::tabular::Dataset;

/// Anything that can translate text into a target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;

    fn name(&self) -> &str;
}

/// Returns text unchanged. Used when translation is disabled.
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _source: Language, _target: Language) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Translator backed by a local Ollama server (`/api/chat`).
pub struct OllamaTranslator {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaTranslator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;
        info!(model = %model, url = %base_url, "Translation endpoint configured");
        Ok(Self {
            base_url,
            model,
            client,
        })
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: format!(
                        "You are a professional translator. Translate the user's text from {source:?} \
                         to {target:?}. Reply with the translation only, without comments."
                    ),
                },
                ChatMessage {
                    role: "user".into(),
                    content: text.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Translation request failed")?
            .error_for_status()
            .context("Translation endpoint returned an error")?
            .json::<ChatResponse>()
            .await
            .context("Malformed translation response")?;

        let translated = response.message.content.trim().to_string();
        if translated.is_empty() {
            anyhow::bail!("Translation endpoint returned empty text");
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// What happened to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    Translated,
    AlreadyTarget,
    Undetected,
    Failed,
}

/// Per-outcome counts for a translation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationSummary {
    pub translated: usize,
    pub already_target: usize,
    pub undetected: usize,
    pub failed: usize,
}

impl TranslationSummary {
    fn record(&mut self, outcome: CellOutcome) {
        match outcome {
            CellOutcome::Translated => self.translated += 1,
            CellOutcome::AlreadyTarget => self.already_target += 1,
            CellOutcome::Undetected => self.undetected += 1,
            CellOutcome::Failed => self.failed += 1,
        }
    }
}

/// Translate one text, failing open.
pub async fn translate_text(
    text: &str,
    translator: &dyn Translator,
    target: Language,
) -> (String, CellOutcome) {
    let Some(source) = detect(text) else {
        return (text.to_string(), CellOutcome::Undetected);
    };
    if source == target {
        return (text.to_string(), CellOutcome::AlreadyTarget);
    }
    match translator.translate(text, source, target).await {
        Ok(translated) => {
            debug!(from = %source, to = %target, "Translated cell");
            (translated, CellOutcome::Translated)
        }
        Err(e) => {
            warn!(error = %e, "Translation failed, keeping original text");
            (text.to_string(), CellOutcome::Failed)
        }
    }
}

/// Translate every non-empty cell of `columns` in place.
///
/// Columns the dataset doesn't have are skipped with a warning.
pub async fn translate_columns(
    dataset: &mut Dataset,
    columns: &[String],
    translator: &dyn Translator,
    target: Language,
) -> TranslationSummary {
    let targets: Vec<usize> = columns
        .iter()
        .filter_map(|c| {
            let idx = dataset.column_index(c);
            if idx.is_none() {
                warn!(column = %c, "Column not in dataset, not translating");
            }
            idx
        })
        .collect();

    let cells: Vec<(usize, usize)> = (0..dataset.len())
        .flat_map(|r| targets.iter().map(move |&c| (r, c)))
        .filter(|&(r, c)| dataset.get(r, c).is_some_and(|t| !t.trim().is_empty()))
        .collect();

    let pb = ProgressBar::new(cells.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {pos}/{len} cells") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut summary = TranslationSummary::default();
    for (r, c) in cells {
        let original = dataset.get(r, c).unwrap_or_default().to_string();
        let (text, outcome) = translate_text(&original, translator, target).await;
        if outcome == CellOutcome::Translated {
            dataset.set(r, c, Some(text));
        }
        summary.record(outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        translator = translator.name(),
        translated = summary.translated,
        skipped = summary.already_target + summary.undetected,
        failed = summary.failed,
        "Translation pass complete"
    );
    summary
}
