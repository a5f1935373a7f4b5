use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::normalize::Language;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. CLI flags override these
/// values per invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where results are written (defaults to ./results).
    pub output_dir: PathBuf,
    /// Base directory for downloaded model files.
    pub model_dir: PathBuf,
    /// Translation endpoint (an Ollama server).
    pub translate_url: String,
    pub translate_model: String,
    /// Language every text is translated to before analysis.
    pub pivot_language: Language,
    /// Seed for LDA sampling and projections.
    pub seed: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every value has a default; only malformed values are errors.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("ARTSCOPE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::models::download::default_model_dir());

        let pivot_language = match env::var("ARTSCOPE_PIVOT_LANGUAGE") {
            Ok(raw) => raw
                .parse::<Language>()
                .context("Invalid ARTSCOPE_PIVOT_LANGUAGE")?,
            Err(_) => Language::English,
        };

        let seed = match env::var("ARTSCOPE_SEED") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid ARTSCOPE_SEED: {raw}"))?,
            Err(_) => 42,
        };

        Ok(Self {
            output_dir: env::var("ARTSCOPE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./results")),
            model_dir,
            translate_url: env::var("ARTSCOPE_TRANSLATE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            translate_model: env::var("ARTSCOPE_TRANSLATE_MODEL")
                .unwrap_or_else(|_| "mistral".to_string()),
            pivot_language,
            seed,
        })
    }

    /// Check that the sentence-embedding model has been downloaded.
    /// Call this before an embedding run that should not fall back to hashing.
    pub fn require_embedding_model(&self) -> Result<()> {
        if !crate::models::download::embedding_files_present(&self.model_dir) {
            anyhow::bail!(
                "Embedding model files not found in {}\n\
                 Run `artscope download-model` to download them.",
                crate::models::download::embedding_model_dir(&self.model_dir).display()
            );
        }
        Ok(())
    }

    /// Check that a translation endpoint is configured.
    pub fn require_translator(&self) -> Result<()> {
        if self.translate_url.trim().is_empty() || self.translate_model.trim().is_empty() {
            anyhow::bail!(
                "ARTSCOPE_TRANSLATE_URL and ARTSCOPE_TRANSLATE_MODEL must not be empty.\n\
                 See .env.example for the translation settings."
            );
        }
        Ok(())
    }
}
