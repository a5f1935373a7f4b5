// Sentence embeddings for the clustering strategy.
//
// The default embedder is all-MiniLM-L6-v2 run locally through ONNX: each
// text becomes a 384-dimensional mean-pooled vector, so answers that say the
// same thing in different words land near each other. When the model hasn't
// been downloaded, HashingEmbedder gives a deterministic bag-of-words vector
// so the pipeline still runs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Texts are sent to the model in chunks of this many.
const BATCH_SIZE: usize = 32;

/// Turns texts into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;
}

/// Sentence embedder using a local ONNX model.
///
/// The session sits behind Arc<Mutex<_>> and the tokenizer behind Arc so
/// both can move into spawn_blocking.
pub struct SentenceEmbedder {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl SentenceEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                anyhow::bail!(
                    "Embedding model file not found: {}\nRun `artscope download-model` to download it.",
                    path.display()
                );
            }
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl Embedder for SentenceEmbedder {
    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let mut out = Vec::with_capacity(texts.len());
        let pb = ProgressBar::new(texts.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("  [{bar:40.cyan/blue}] {pos}/{len} embedded") {
            pb.set_style(style.progress_chars("=> "));
        }
        for chunk in texts.chunks(BATCH_SIZE) {
            let session = Arc::clone(&self.session);
            let tokenizer = Arc::clone(&self.tokenizer);
            let chunk = chunk.to_vec();
            let vectors =
                tokio::task::spawn_blocking(move || embed_sync(&session, &tokenizer, &chunk))
                    .await
                    .context("spawn_blocking panicked")??;
            pb.inc(vectors.len() as u64);
            out.extend(vectors);
        }
        pb.finish_and_clear();
        Ok(out)
    }
}

/// Tokenize, run the model, and mean-pool over the attention mask.
fn embed_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    texts: &[String],
) -> Result<Vec<Vec<f64>>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
    }

    // BERT inputs, right-padded with 0 (the pad token id and a zero mask)
    let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    for enc in &encodings {
        let pad = max_len - enc.get_ids().len();
        input_ids.extend(enc.get_ids().iter().map(|&id| id as i64));
        input_ids.extend(std::iter::repeat_n(0i64, pad));
        attention_mask.extend(enc.get_attention_mask().iter().map(|&m| m as i64));
        attention_mask.extend(std::iter::repeat_n(0i64, pad));
    }
    let token_type_ids = vec![0i64; batch_size * max_len];

    let shape = [batch_size as i64, max_len as i64];
    let input_ids_tensor =
        Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
        .context("Failed to create token_type_ids tensor")?;

    // last_hidden_state: [batch, seq_len, 384]
    let hidden_states = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("Embedding ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        data.to_vec()
    };

    let mut embeddings = Vec::with_capacity(batch_size);
    for i in 0..batch_size {
        let mut sum = vec![0.0_f64; EMBEDDING_DIM];
        let mut mask_sum = 0.0_f64;
        for j in 0..max_len {
            if attention_mask[i * max_len + j] == 0 {
                continue;
            }
            mask_sum += 1.0;
            let offset = (i * max_len + j) * EMBEDDING_DIM;
            for (k, s) in sum.iter_mut().enumerate() {
                *s += hidden_states[offset + k] as f64;
            }
        }
        if mask_sum > 0.0 {
            for val in &mut sum {
                *val /= mask_sum;
            }
        }
        embeddings.push(sum);
    }

    debug!(batch_size, dim = EMBEDDING_DIM, "Computed sentence embeddings");
    Ok(embeddings)
}

/// Deterministic signed feature hashing of lowercase words.
///
/// Not semantic, but texts sharing vocabulary end up close, which is enough
/// for clustering when no sentence model is available.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    pub dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl HashingEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f64> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2)
        {
            *counts.entry(word.to_lowercase()).or_insert(0) += 1;
        }

        let mut v = vec![0.0; self.dimension];
        for (word, n) in counts {
            let h = fnv1a(word.as_bytes());
            let idx = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign * (1.0 + (n as f64).ln());
        }
        l2_normalize(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Scale `v` to unit length in place. Zero vectors are left alone.
pub fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity clamped to [0, 1]. Mismatched or zero vectors give 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}

/// Pairwise cosine similarity of every vector against every other.
pub fn similarity_matrix(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    vectors
        .iter()
        .map(|a| vectors.iter().map(|b| cosine_similarity(a, b)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite_clamps_to_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cosine_mismatched_or_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12 && (v[1] - 0.8).abs() < 1e-12);
        let mut z = vec![0.0, 0.0];
        l2_normalize(&mut z);
        assert_eq!(z, vec![0.0, 0.0]);
    }

    #[test]
    fn test_hashing_embedder_is_deterministic_and_unit_length() {
        let e = HashingEmbedder::default();
        let a = e.embed("Painting studio for local artists");
        let b = e.embed("Painting studio for local artists");
        assert_eq!(a, b);
        let norm: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(e.embed("").iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_hashing_embedder_similarity_tracks_vocabulary() {
        let e = HashingEmbedder::default();
        let a = e.embed("painting studio residency");
        let b = e.embed("painting studio gallery");
        let c = e.embed("compost garden vegetables");
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[test]
    fn test_similarity_matrix_diagonal() {
        let m = similarity_matrix(&[vec![1.0, 0.0], vec![0.0, 2.0]]);
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert!(m[0][1].abs() < 1e-12);
    }
}
