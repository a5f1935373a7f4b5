// Download helper for the sentence-embedding model.
//
// all-MiniLM-L6-v2 (~90 MB) is fetched from HuggingFace into a platform data
// directory (~/.local/share/artscope/models/ on Linux) so it persists across
// runs. Without it the embedding strategy falls back to hashed features.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

const EMBEDDING_HF_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

/// Remote paths, relative to the repo root, and their local names.
const EMBEDDING_FILES: [(&str, &str, bool); 2] = [
    ("tokenizer.json", "tokenizer.json", false),
    ("onnx/model.onnx", "model.onnx", true),
];

/// ~/.local/share/artscope/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("artscope")
        .join("models")
}

/// Subdirectory of `base` holding the embedding model.
pub fn embedding_model_dir(base: &Path) -> PathBuf {
    base.join("all-MiniLM-L6-v2")
}

pub fn embedding_files_present(base: &Path) -> bool {
    let dir = embedding_model_dir(base);
    EMBEDDING_FILES
        .iter()
        .all(|(_, local, _)| dir.join(local).exists())
}

/// Download the embedding model into `base`, skipping files already present.
pub async fn download_model(base: &Path) -> Result<()> {
    let dir = embedding_model_dir(base);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nSentence embedding model (all-MiniLM-L6-v2):");
    for (remote, local, large) in EMBEDDING_FILES {
        let dest = dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {local} (already exists)");
            continue;
        }
        if large {
            println!("  Downloading {local} (~90 MB)...");
        } else {
            println!("  Downloading {local}...");
        }
        download_file(&format!("{EMBEDDING_HF_URL}/{remote}"), &dest, large).await?;
    }
    Ok(())
}

async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = show_progress.then(|| match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("    {spinner} {bytes}")
                    .expect("valid template"),
            );
            pb
        }
    });

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        body.extend_from_slice(&chunk);
        if let Some(pb) = &pb {
            pb.set_position(body.len() as u64);
        }
    }

    std::fs::write(dest, &body).with_context(|| format!("Failed to write {}", dest.display()))?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(url, dest = %dest.display(), "Downloaded model file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_artscope() {
        let dir = default_model_dir();
        let path = dir.to_string_lossy();
        assert!(path.contains("artscope") && path.contains("models"), "got: {path}");
    }

    #[test]
    fn test_embedding_files_present() {
        let base = std::env::temp_dir().join(format!("artscope-models-{}", std::process::id()));
        assert!(!embedding_files_present(&base));

        let dir = embedding_model_dir(&base);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("model.onnx"), b"fake").unwrap();
        assert!(!embedding_files_present(&base));
        std::fs::write(dir.join("tokenizer.json"), b"fake").unwrap();
        assert!(embedding_files_present(&base));

        std::fs::remove_dir_all(&base).unwrap();
    }
}
